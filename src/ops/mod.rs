pub mod age;
pub mod dates;
pub mod filter;
pub mod labels;
pub mod reconcile;
pub mod rows;
pub mod sort;
pub mod view;
