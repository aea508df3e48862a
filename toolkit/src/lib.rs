pub mod from_str_ex;
pub mod sorted_map;
pub mod table_by_range;
pub mod status;
pub mod splits;
pub mod stats;
pub mod text;
