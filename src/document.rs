//! Labeled documents and the sources that produce them.
//!
//! A [`Document`] is a text payload (possibly absent) with zero or more
//! category ids. Tokenization is deterministic and comparatively expensive, so
//! the token sequence is computed once per document and cached on it.
//!
//! [`JsonDocumentSource`] reads the two JSON layouts the corpora come in:
//!
//! ```json
//! [{"kbId": "faq", "answer": "Reset it from settings", "relatedCategories": [{"id": "12"}]}]
//! ```
//!
//! ```json
//! [{"id": "7", "title": {"original": "Reset", "tokens": ["reset"]},
//!   "body": {"original": "From settings", "tokens": ["settings"]}, "categories": ["12"]}]
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::Analyzer;
use crate::error::{FaqcatError, Result};

/// A text payload with its category labels.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Source identifier, when the corpus provides one.
    pub id: Option<String>,
    /// Raw text; `None` for records without an answer.
    pub text: Option<String>,
    /// Category ids in corpus order.
    pub categories: Vec<String>,
    /// Cached token sequence.
    pub tokens: Option<Vec<String>>,
}

impl Document {
    pub fn new<S: Into<String>>(text: S, categories: Vec<String>) -> Self {
        Document {
            id: None,
            text: Some(text.into()),
            categories,
            tokens: None,
        }
    }

    /// A document with labels but no text.
    pub fn without_text(categories: Vec<String>) -> Self {
        Document {
            categories,
            ..Default::default()
        }
    }

    /// A document whose tokens are already known.
    pub fn from_tokens(tokens: Vec<String>, categories: Vec<String>) -> Self {
        Document {
            text: Some(tokens.join(" ")),
            tokens: Some(tokens),
            categories,
            ..Default::default()
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn add_category<S: Into<String>>(&mut self, id: S) {
        self.categories.push(id.into());
    }

    /// Whether the document has non-empty text.
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    pub fn has_labels(&self) -> bool {
        !self.categories.is_empty()
    }

    /// Cached tokens, or an empty slice if the document was never tokenized.
    pub fn tokens(&self) -> &[String] {
        self.tokens.as_deref().unwrap_or(&[])
    }

    /// Fill the token cache with `analyzer` unless it is already filled.
    /// Documents without text get an empty token sequence.
    pub fn tokenize_with(&mut self, analyzer: &dyn Analyzer) -> Result<&[String]> {
        if self.tokens.is_none() {
            let tokens = match self.text.as_deref() {
                Some(text) => analyzer.analyze_to_strings(text)?,
                None => Vec::new(),
            };
            self.tokens = Some(tokens);
        }
        Ok(self.tokens())
    }
}

/// Tokenize every document of a corpus, keeping already cached sequences.
pub fn tokenize_all(documents: &mut [Document], analyzer: &dyn Analyzer) -> Result<()> {
    for document in documents.iter_mut() {
        document.tokenize_with(analyzer)?;
    }
    Ok(())
}

/// A provider of labeled documents.
pub trait DocumentSource {
    /// Load every document of the source.
    fn documents(&self) -> Result<Vec<Document>>;

    /// Get the name of this source (for logging).
    fn name(&self) -> &str;
}

impl DocumentSource for Vec<Document> {
    fn documents(&self) -> Result<Vec<Document>> {
        Ok(self.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[derive(Debug, Deserialize)]
struct KnowledgeBaseRecord {
    #[serde(rename = "kbId", default)]
    kb_id: Option<Value>,
    answer: Option<String>,
    #[serde(rename = "relatedCategories", default)]
    related_categories: Option<Vec<CategoryRef>>,
}

#[derive(Debug, Deserialize)]
struct CategoryRef {
    id: Value,
}

#[derive(Debug, Deserialize)]
struct TokenizedRecord {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: Option<TokenizedField>,
    #[serde(default)]
    body: Option<TokenizedField>,
    #[serde(default)]
    categories: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenizedField {
    #[serde(default)]
    original: Option<String>,
    #[serde(default)]
    tokens: Option<Vec<String>>,
}

fn id_to_string(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(FaqcatError::invalid_argument(format!(
            "Identifier must be a string or number, got {other}"
        ))),
    }
}

impl KnowledgeBaseRecord {
    fn into_document(self) -> Result<Document> {
        let categories = self
            .related_categories
            .unwrap_or_default()
            .iter()
            .map(|c| id_to_string(&c.id))
            .collect::<Result<Vec<_>>>()?;
        Ok(Document {
            id: self.kb_id.as_ref().map(id_to_string).transpose()?,
            text: self.answer,
            categories,
            tokens: None,
        })
    }
}

impl TokenizedRecord {
    fn into_document(self) -> Result<Document> {
        let categories = self
            .categories
            .iter()
            .map(id_to_string)
            .collect::<Result<Vec<_>>>()?;
        let id = self.id.as_ref().map(id_to_string).transpose()?;

        let title = self.title.unwrap_or_default();
        let body = self.body.unwrap_or_default();

        let text = [title.original.as_deref(), body.original.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        // Precomputed tokens win over re-tokenizing; title tokens come first.
        let tokens = match (title.tokens, body.tokens) {
            (None, None) => None,
            (title_tokens, body_tokens) => Some(
                title_tokens
                    .unwrap_or_default()
                    .into_iter()
                    .chain(body_tokens.unwrap_or_default())
                    .collect(),
            ),
        };

        Ok(Document {
            id,
            text: (!text.is_empty()).then_some(text),
            categories,
            tokens,
        })
    }
}

/// Reads documents from a JSON array in either knowledge-base export or
/// tokenized-dataset layout. Layouts may be mixed record by record.
#[derive(Debug, Clone)]
pub struct JsonDocumentSource {
    path: PathBuf,
    name: String,
}

impl JsonDocumentSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        JsonDocumentSource {
            name: path.display().to_string(),
            path,
        }
    }

    /// Parse documents from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Document>> {
        let records: Vec<Value> = serde_json::from_reader(reader)?;
        records.into_iter().map(Self::parse_record).collect()
    }

    fn parse_record(record: Value) -> Result<Document> {
        let is_knowledge_base = record
            .as_object()
            .is_some_and(|o| o.contains_key("answer") || o.contains_key("relatedCategories"));
        if is_knowledge_base {
            serde_json::from_value::<KnowledgeBaseRecord>(record)?.into_document()
        } else {
            serde_json::from_value::<TokenizedRecord>(record)?.into_document()
        }
    }

    /// Parse documents from a JSON string.
    pub fn parse_str(json: &str) -> Result<Vec<Document>> {
        Self::from_reader(json.as_bytes())
    }
}

impl DocumentSource for JsonDocumentSource {
    fn documents(&self) -> Result<Vec<Document>> {
        let file = File::open(&self.path)?;
        let documents = Self::from_reader(BufReader::new(file))?;
        debug!("Loaded {} documents from {}", documents.len(), self.name);
        Ok(documents)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
