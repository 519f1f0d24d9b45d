pub mod alloc;
pub mod export;
pub mod history;
pub mod setup;
pub mod ui;
