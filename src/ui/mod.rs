pub mod app;
mod draw;
mod form;
mod panes;
