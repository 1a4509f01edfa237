pub mod recommendation;

pub use recommendation::PgRecommendationStore;
