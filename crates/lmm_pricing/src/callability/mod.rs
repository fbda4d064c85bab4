//! Exercise values, basis systems and node-data collection.

pub mod basis_system;
pub mod collect;
pub mod exercise_value;
pub mod node_data;

pub use basis_system::{BasisSystem, SwapBasisSystem};
pub use collect::{collect_node_data, collect_node_data_parallel};
pub use exercise_value::{ExerciseValue, NothingExerciseValue};
pub use node_data::NodeData;
