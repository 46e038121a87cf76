pub mod cache;
pub mod debounce;
pub mod descriptor;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod phase;
pub mod selection;
pub mod session;
pub mod summarize;
pub mod surfaces;
pub mod sync;

pub use cache::{CacheKey, CachedDataset, FileSessionStore, MemorySessionStore, SessionStore};
pub use debounce::{AdaptiveDebounce, Debounced};
pub use descriptor::ViewDescriptor;
pub use error::SessionError;
pub use filter::{search, FilterState};
pub use pagination::{Pager, DEFAULT_PAGE_SIZE};
pub use phase::{LoadGuard, LoadTicket, Phase, RenderScope};
pub use selection::{record_id, resolve_record};
pub use session::{ListingsSession, LoadedView, PendingLoad, SessionOptions};
pub use summarize::{summarize, SummaryToggle};
pub use surfaces::{map_points, DisplayFields, FragmentRouter, ListPage, MapPoint, Router, Surfaces};
pub use sync::{reduce, StatePatch};
