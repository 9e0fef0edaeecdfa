pub mod ai;
pub mod entity;
pub mod object;
pub mod rules;
pub mod tile;
pub mod tools;
