pub mod amount;
pub mod debounce;
