pub mod raw_row;
