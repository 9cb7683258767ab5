pub mod api;
pub mod case;
pub mod player;
pub mod text;
