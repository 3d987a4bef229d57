pub mod row;

pub use row::{ArrayRow, Columns, FromArrayRow, FromRow, Row};
