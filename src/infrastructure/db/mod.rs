pub mod deadline;
pub mod factory;
pub mod memory;
pub mod mongo;
pub mod pocketbase;
pub mod postgres;
