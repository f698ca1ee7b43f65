//! UI module - reusable widgets shared by the panels and modals

pub mod components;
