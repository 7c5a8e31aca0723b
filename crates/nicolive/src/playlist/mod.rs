mod rewriter;

pub use rewriter::{PlaylistAnomaly, PlaylistRewriter, RewriteSummary, rewrite_playlist};
