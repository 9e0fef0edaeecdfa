pub mod deadline;
pub mod event;
pub mod machine;
pub mod maps;
pub mod progression;
pub mod puzzle;
pub mod setup;
pub mod step;
pub mod world;
