pub mod checkpoint;
pub mod delete;
pub mod events;
pub mod notify;
pub mod set;
pub mod snapshot;

use calfold_core::CalendarAgent;
use calfold_core::host::UuidAllocator;

use crate::local::{FileLog, FileScheduler};

pub type Agent = CalendarAgent<FileLog, UuidAllocator, FileScheduler>;
