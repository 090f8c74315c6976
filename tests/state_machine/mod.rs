mod ownership;
mod transition_table;
