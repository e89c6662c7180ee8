//! Widget state machine.
//!
//! A widget is a single task that owns its state, its chart resource and its
//! debounce timer. Everything reaches it as a message on one inbox, in
//! arrival order:
//!
//! - bridge events from the host ([`WidgetPort`]),
//! - user actions from the UI ([`WidgetHandle`]),
//! - debounce expiries and recomputation outcomes it scheduled itself.
//!
//! Recomputations run as separate tasks and report back through the inbox,
//! so host context changes are never queued behind them. Each call carries a
//! sequence number and only the answer to the latest call is applied.

mod debounce;
mod driver;
mod handle;
mod state;
mod surface;

pub use debounce::Debouncer;
pub use driver::{Widget, WidgetConfig};
pub use handle::{WidgetHandle, WidgetPort};
pub use state::{WidgetSnapshot, WidgetState};
pub use surface::{ChartId, ChartSpec, Frame, HeadlessSurface, Palette, Surface};
