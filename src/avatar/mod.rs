//! Avatar generation: seed policy, remote source, character-art conversion,
//! offline fallback and the manager that orchestrates them.

pub mod convert;
pub mod error;
pub mod fallback;
pub mod manager;
pub mod policy;
pub mod remote;

pub use convert::{
    palette_for_width, raster_url, render, trim_blank_rows, ArtConverter, RasterPipeline,
    DEFAULT_MAX_RASTER_BYTES,
};
pub use error::{AvatarError, TransportKind};
pub use manager::{AvatarManager, FixedLevel, LevelProvider, NetworkStatus};
pub use policy::{derive_fingerprint, derive_params, derive_seed, RemoteParams};
pub use remote::{DiceBearClient, VectorSource, DEFAULT_BASE_URL};
