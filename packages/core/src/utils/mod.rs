pub mod contest;
pub mod keyed_lock;
pub mod lookup;
