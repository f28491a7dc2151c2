pub mod buffer;
pub mod command;
pub mod event;
pub mod sequencer;
pub mod settings;
