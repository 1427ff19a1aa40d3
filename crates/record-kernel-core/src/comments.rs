use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{CommentId, DocumentId, KernelError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FixedState {
    Done,
    Undone,
}

/// An inline review comment anchored to a line range of one document.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub document_id: DocumentId,
    #[serde(default)]
    pub line_number: u32,
    /// Extra lines covered after `line_number`; 0 anchors a single line.
    #[serde(default)]
    pub line_length: u32,
    #[serde(default)]
    pub is_new_file: bool,
    #[serde(default)]
    pub fixed_state: Option<FixedState>,
    #[serde(default)]
    pub has_replies: bool,
    #[serde(default)]
    pub reply_to: Option<CommentId>,
    #[serde(default)]
    pub content: String,
}

/// Position ordering of comments inside one document. Field order is the sort order.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CommentSortKey {
    pub line_number: u32,
    pub line_length: u32,
    pub id: CommentId,
}

impl Comment {
    #[must_use]
    pub fn sort_key(&self) -> CommentSortKey {
        CommentSortKey { line_number: self.line_number, line_length: self.line_length, id: self.id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub filename: String,
}

/// Display order of documents: by filename, then id.
#[must_use]
pub fn display_order_by_filename(documents: &[Document]) -> Vec<DocumentId> {
    let mut ordered = documents.iter().collect::<Vec<_>>();
    ordered.sort_by(|lhs, rhs| lhs.filename.cmp(&rhs.filename).then_with(|| lhs.id.cmp(&rhs.id)));
    let mut seen = BTreeSet::new();
    ordered.into_iter().map(|document| document.id).filter(|id| seen.insert(*id)).collect()
}

/// What to do with comments whose document is missing from the display order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StrayCommentPolicy {
    #[default]
    Reject,
    Drop,
}

impl StrayCommentPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Drop => "drop",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "reject" => Some(Self::Reject),
            "drop" => Some(Self::Drop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct CommentGroup<'a> {
    pub document_id: DocumentId,
    pub comments: Vec<&'a Comment>,
}

/// Comments per document, iterated in display order.
#[derive(Debug, Clone, Default, Serialize, Eq, PartialEq)]
#[serde(transparent)]
pub struct CommentGroups<'a> {
    groups: Vec<CommentGroup<'a>>,
}

impl<'a> CommentGroups<'a> {
    pub fn iter(&self) -> std::slice::Iter<'_, CommentGroup<'a>> {
        self.groups.iter()
    }

    #[must_use]
    pub fn get(&self, document_id: DocumentId) -> Option<&[&'a Comment]> {
        self.groups
            .iter()
            .find(|group| group.document_id == document_id)
            .map(|group| group.comments.as_slice())
    }

    #[must_use]
    pub fn document_ids(&self) -> Vec<DocumentId> {
        self.groups.iter().map(|group| group.document_id).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<'g, 'a> IntoIterator for &'g CommentGroups<'a> {
    type Item = &'g CommentGroup<'a>;
    type IntoIter = std::slice::Iter<'g, CommentGroup<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Group comments by document and order each group by position.
///
/// Documents appear in `display_order`; documents without comments are left out.
/// Within a document comments sort by line, then span length, then id, which is
/// a total order independent of the input order.
///
/// # Errors
/// Returns [`KernelError::Configuration`] when `display_order` is empty while
/// there are comments, or lists a document twice, and
/// [`KernelError::Validation`] when `policy` is [`StrayCommentPolicy::Reject`]
/// and some comments belong to documents outside `display_order`.
pub fn group_and_order<'a>(
    comments: &'a [Comment],
    display_order: &[DocumentId],
    policy: StrayCommentPolicy,
) -> Result<CommentGroups<'a>, KernelError> {
    if display_order.is_empty() && !comments.is_empty() {
        return Err(KernelError::Configuration(
            "document display order MUST be provided when comments are present".to_string(),
        ));
    }

    let mut known = BTreeSet::new();
    for document_id in display_order {
        if !known.insert(*document_id) {
            return Err(KernelError::Configuration(format!(
                "document display order lists document {document_id} more than once"
            )));
        }
    }

    let mut buckets: BTreeMap<DocumentId, Vec<&'a Comment>> = BTreeMap::new();
    for comment in comments {
        buckets.entry(comment.document_id).or_default().push(comment);
    }

    let strays = buckets.keys().filter(|id| !known.contains(*id)).copied().collect::<Vec<_>>();
    if !strays.is_empty() {
        let listed = strays.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        match policy {
            StrayCommentPolicy::Reject => {
                return Err(KernelError::Validation(format!(
                    "comments reference documents outside the display order: [{listed}]"
                )));
            }
            StrayCommentPolicy::Drop => {
                tracing::debug!(documents = %listed, "dropping comments on undisplayed documents");
            }
        }
    }

    let mut groups = Vec::with_capacity(buckets.len().min(display_order.len()));
    for document_id in display_order {
        let Some(mut bucket) = buckets.remove(document_id) else {
            continue;
        };
        bucket.sort_by_key(|comment| comment.sort_key());
        groups.push(CommentGroup { document_id: *document_id, comments: bucket });
    }

    tracing::trace!(
        comments = comments.len(),
        groups = groups.len(),
        "grouped inline comments"
    );

    Ok(CommentGroups { groups })
}
