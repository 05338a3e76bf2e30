//! Pipeline construction for the aggregate and vectorSearch operations.

use super::document::{QueryDocument, overlay_except};
use crate::tool::entities::VectorSearchTuning;
use crate::tool::validation::ParamValues;
use serde_json::{Value, json};
use thiserror::Error;

/// Parameter carrying the vector index name.
pub const INDEX_NAME_PARAM: &str = "indexName";
/// Parameter carrying the query embedding.
pub const QUERY_VECTOR_PARAM: &str = "queryVector";
/// Parameter naming the document field that stores embeddings.
pub const PATH_PARAM: &str = "path";

pub const DEFAULT_NUM_CANDIDATES: u32 = 10;
pub const DEFAULT_LIMIT: u32 = 10;

/// Stage operator for filtering.
pub const MATCH_STAGE: &str = "$match";
/// Stage operator for similarity search.
pub const VECTOR_SEARCH_STAGE: &str = "$vectorSearch";

/// A vectorSearch parameter is absent or has the wrong shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VectorSearchParamError {
    #[error("missing required vector search parameter '{0}'")]
    Missing(&'static str),

    #[error("vector search parameter '{name}' must be {expected}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
    },
}

impl VectorSearchParamError {
    pub fn parameter(&self) -> &'static str {
        match self {
            VectorSearchParamError::Missing(name) => name,
            VectorSearchParamError::Invalid { name, .. } => name,
        }
    }
}

/// One stage per validated parameter, keyed by parameter name.
pub fn parameter_stages(params: &ParamValues) -> Vec<QueryDocument> {
    params
        .iter()
        .map(|p| {
            let mut stage = QueryDocument::new();
            stage.insert(p.name.clone(), p.value.clone());
            stage
        })
        .collect()
}

/// Everything needed to build a similarity-search pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSearchRequest {
    pub index: String,
    pub query_vector: Vec<f64>,
    pub path: String,
    pub num_candidates: u32,
    pub limit: u32,
    /// Equality pre-filter: the template overlaid with non-vector parameters
    pub filter: QueryDocument,
}

impl VectorSearchRequest {
    /// Extract and check the three vector parameters.
    ///
    /// Checked in order `indexName`, `queryVector`, `path`; the first failure
    /// is reported.
    pub fn from_params(
        template: &QueryDocument,
        params: &ParamValues,
        tuning: VectorSearchTuning,
    ) -> Result<Self, VectorSearchParamError> {
        let index = require_string(params, INDEX_NAME_PARAM)?;
        let query_vector = require_vector(params)?;
        let path = require_string(params, PATH_PARAM)?;

        let filter = overlay_except(
            template,
            params,
            &[INDEX_NAME_PARAM, QUERY_VECTOR_PARAM, PATH_PARAM],
        );

        Ok(Self {
            index,
            query_vector,
            path,
            num_candidates: tuning.num_candidates,
            limit: tuning.limit,
            filter,
        })
    }

    /// The similarity-search stage document.
    pub fn search_stage(&self) -> QueryDocument {
        let mut stage = QueryDocument::new();
        stage.insert(
            VECTOR_SEARCH_STAGE.to_string(),
            json!({
                "index": self.index,
                "path": self.path,
                "queryVector": self.query_vector,
                "numCandidates": self.num_candidates,
                "limit": self.limit,
            }),
        );
        stage
    }

    /// `[$match?, $vectorSearch]`. The match stage is omitted for an empty filter.
    pub fn pipeline(&self) -> Vec<QueryDocument> {
        let mut pipeline = Vec::with_capacity(2);
        if !self.filter.is_empty() {
            let mut stage = QueryDocument::new();
            stage.insert(
                MATCH_STAGE.to_string(),
                Value::Object(self.filter.clone()),
            );
            pipeline.push(stage);
        }
        pipeline.push(self.search_stage());
        pipeline
    }
}

fn require_string(
    params: &ParamValues,
    name: &'static str,
) -> Result<String, VectorSearchParamError> {
    match params.get(name) {
        None => Err(VectorSearchParamError::Missing(name)),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(_) => Err(VectorSearchParamError::Invalid {
            name,
            expected: "a non-empty string",
        }),
    }
}

fn require_vector(params: &ParamValues) -> Result<Vec<f64>, VectorSearchParamError> {
    let invalid = VectorSearchParamError::Invalid {
        name: QUERY_VECTOR_PARAM,
        expected: "a non-empty array of numbers",
    };
    let values = params
        .get(QUERY_VECTOR_PARAM)
        .ok_or(VectorSearchParamError::Missing(QUERY_VECTOR_PARAM))?
        .as_array()
        .ok_or_else(|| invalid.clone())?;
    if values.is_empty() {
        return Err(invalid);
    }
    values
        .iter()
        .map(|v| v.as_f64().ok_or_else(|| invalid.clone()))
        .collect()
}
