mod linguistic;

pub use linguistic::{
    AnalysisOutcome, AssociationType, AssociationsPayload, ProcessingStatus, RequestSource,
    RequestType, WordAssociation,
};
