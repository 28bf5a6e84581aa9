pub mod bucket;
pub mod similarity;
pub mod simplify;
pub mod wlof;

pub use bucket::{temporal_tprecision, temporal_tsample, twavg, twcentroid};
pub use similarity::{
    dyntimewarp_distance, frechet_distance, hausdorff_distance, similarity_path, Match, SimFunc,
};
pub use simplify::{simplify_dp, simplify_max_dist, simplify_min_dist, simplify_min_tdelta};
pub use wlof::geo_wlof;
