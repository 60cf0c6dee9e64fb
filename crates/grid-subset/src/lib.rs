//! Ocean model grid subsetting.
//!
//! Cuts a bounding box and time window out of a model dataset and writes
//! the result, with its grid coordinates, to a netCDF-4 file. Both
//! separable lat/lon grids (HYCOM) and staggered curvilinear Arakawa-C
//! grids (ROMS: TBOFS, CBOFS) are supported.
//!
//! # Architecture
//!
//! ```text
//! SubsetRequest (region, time, depth, stride)
//!      │
//!      ▼
//! BoundingRegion::to_box  ──► rotate into grid longitude domain
//!      │
//!      ▼
//! GridFamily::compute_window (WindowCache)
//!      │
//!      ├─► GridFamily::family_windows   (rho, u, v, psi)
//!      │
//!      ├─► TimeAxis::select             (TimeSelection / TimePolicy)
//!      │
//!      └─► build_plan ──► SubsetWriter::write (.partial + rename)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use dataset_access::NetcdfSource;
//! use grid_subset::{GridDescriptor, ModelRegistry, SubsetConfig, SubsetRequest, Subsetter};
//!
//! let registry = ModelRegistry::load_dir("config/models")?;
//! let model = registry.get("TBOFS")?;
//! let source = NetcdfSource::open(&model.url)?;
//! let descriptor = GridDescriptor::load(&source, model.grid_kind, &model.variables)?;
//!
//! let request = SubsetRequest::for_model(model, BoundingBox::new(-82.8, 27.5, -82.5, 27.8));
//! let subsetter = Subsetter::new(SubsetConfig::from_env())?;
//! subsetter.subset(&source, None, &descriptor, &model.variables, &request, Path::new("tbofs.nc"))?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod grid;
pub mod mapping;
pub mod plan;
pub mod registry;
pub mod subsetter;
pub mod time_window;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use cache::{WindowCache, WindowKey};
pub use config::SubsetConfig;
pub use error::{Result, SubsetError};
pub use grid::{
    CoordinateGrid, CurvilinearGrid, GridDescriptor, GridFamily, GridIndexer, GridKind,
    RectangularGrid,
};
pub use mapping::VariableMapping;
pub use plan::{OutputDimension, OutputVariable, SubsetPlan};
pub use registry::{ModelEntry, ModelRegistry};
pub use subsetter::{SubsetRequest, Subsetter};
pub use time_window::{TimeAxis, TimePolicy, TimeSelection, TimeSummary};
pub use types::{CacheStats, DepthSelection, FamilyWindows, HorizontalWindow, IndexWindow, PointFamily};
pub use writer::{partial_path, SubsetWriter};
