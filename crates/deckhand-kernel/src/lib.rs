//! deckhand-kernel: workspace tab model, tab store, and mount/lifecycle kernel.
//! Pure state transitions with no IO. The store is the single mutation
//! authority for tab existence, order, and the active tab id.

pub mod error;
pub mod generation;
pub mod kernel;
pub mod registry;
pub mod store;
pub mod tab;

pub use error::RegistryError;
pub use generation::{Generation, GenerationCounter};
pub use kernel::{
    LifecycleEvent, LifecycleHook, WorkspaceKernelSnapshot, WorkspaceMountPlan,
    build_workspace_kernel_snapshot, build_workspace_mount_plan, compute_workspace_lifecycle_events,
    dispatch_lifecycle_events,
};
pub use registry::{TabModule, TabTypeRegistry};
pub use store::{DEFAULT_MAX_TABS, TabState, TabStore};
pub use tab::{TabInput, TabLifecycle, TabMeta, WorkspaceTab};
