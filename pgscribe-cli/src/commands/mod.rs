pub mod db;
pub mod generate;
