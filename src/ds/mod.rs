pub mod intrusive_list;
pub mod lazy_heap;
pub mod shard;
pub mod slot_arena;

pub use intrusive_list::IntrusiveList;
pub use lazy_heap::LazyMinHeap;
pub use shard::ShardSelector;
pub use slot_arena::{SlotArena, SlotId};
