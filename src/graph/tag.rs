//! Node and edge payloads ("tags") attached to a [`Graph`](crate::graph::Graph)

use std::fmt;

/// Application payload stored on nodes and edges.
///
/// A tag is default-constructible, comparable and has a textual form that
/// round-trips through the line-oriented graph formats in [`crate::data`].
/// An empty textual form means "no tag" to the writers.
pub trait Tag: Clone + Default + PartialEq {
    /// Textual form used by the graph writers.
    fn to_text(&self) -> String;

    /// Parse the textual form; `None` if the text is not a valid tag.
    fn from_text(text: &str) -> Option<Self>;
}

/// Tag that carries nothing. Its textual form is the empty string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NullTag;

impl Tag for NullTag {
    fn to_text(&self) -> String {
        String::new()
    }

    fn from_text(_text: &str) -> Option<Self> {
        Some(NullTag)
    }
}

impl Tag for String {
    fn to_text(&self) -> String {
        self.clone()
    }

    fn from_text(text: &str) -> Option<Self> {
        Some(text.trim().to_string())
    }
}

macro_rules! numeric_tag {
    ($($t:ty),*) => {
        $(
            impl Tag for $t {
                fn to_text(&self) -> String {
                    self.to_string()
                }

                fn from_text(text: &str) -> Option<Self> {
                    text.trim().parse().ok()
                }
            }
        )*
    };
}

numeric_tag!(f64, f32, usize, u32, i64, i32);

/// A node tag paired with an accumulated centrality score.
///
/// This is the node payload of the betweenness working copy: the original
/// tag is kept so results can be reported by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scored<T> {
    pub tag: T,
    pub centrality: f64,
}

impl<T> Scored<T> {
    pub fn new(tag: T) -> Self {
        Self { tag, centrality: 0.0 }
    }
}

impl<T: Tag> Tag for Scored<T> {
    fn to_text(&self) -> String {
        format!("{} {}", self.tag.to_text(), self.centrality)
    }

    fn from_text(text: &str) -> Option<Self> {
        let (tag, centrality) = text.trim().rsplit_once(' ')?;
        Some(Self {
            tag: T::from_text(tag)?,
            centrality: centrality.parse().ok()?,
        })
    }
}

impl<T: Tag> fmt::Display for Scored<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
