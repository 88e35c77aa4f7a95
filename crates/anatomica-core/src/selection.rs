//! Single-selection state and the highlight styles it drives

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Label index {index} out of range (have {count})")]
    OutOfRange { index: usize, count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionState {
    #[default]
    Unselected,
    Selected(usize),
}

impl SelectionState {
    pub fn selected(&self) -> Option<usize> {
        match self {
            SelectionState::Selected(index) => Some(*index),
            SelectionState::Unselected => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Border {
    Plain,
    Glow,
}

/// Visual treatment shared by a label's marker, overlay, and list entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightStyle {
    pub emissive_intensity: f32,
    pub opacity: f32,
    pub marker_scale: f32,
    /// Whether the marker color is shifted toward the highlight tint
    pub color_shift: bool,
    pub border: Border,
}

impl HighlightStyle {
    pub const DEFAULT: HighlightStyle = HighlightStyle {
        emissive_intensity: 0.2,
        opacity: 0.85,
        marker_scale: 1.0,
        color_shift: false,
        border: Border::Plain,
    };

    pub const EMPHASIZED: HighlightStyle = HighlightStyle {
        emissive_intensity: 1.0,
        opacity: 1.0,
        marker_scale: 1.5,
        color_shift: true,
        border: Border::Glow,
    };

    pub fn is_emphasized(&self) -> bool {
        *self == Self::EMPHASIZED
    }
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Tracks the selected label and the per-label highlight styles
#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    state: SelectionState,
    styles: Vec<HighlightStyle>,
}

impl Highlighter {
    pub fn new(count: usize) -> Self {
        Self {
            state: SelectionState::Unselected,
            styles: vec![HighlightStyle::DEFAULT; count],
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn styles(&self) -> &[HighlightStyle] {
        &self.styles
    }

    pub fn style(&self, index: usize) -> Option<HighlightStyle> {
        self.styles.get(index).copied()
    }

    /// Make `index` the only emphasized element
    ///
    /// An out-of-range index leaves both the state and the styles untouched.
    pub fn select(&mut self, index: usize) -> Result<(), SelectionError> {
        if index >= self.styles.len() {
            return Err(SelectionError::OutOfRange {
                index,
                count: self.styles.len(),
            });
        }

        self.styles.fill(HighlightStyle::DEFAULT);
        self.styles[index] = HighlightStyle::EMPHASIZED;
        self.state = SelectionState::Selected(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emphasized(highlighter: &Highlighter) -> Vec<usize> {
        highlighter
            .styles()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_emphasized())
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_starts_unselected() {
        let highlighter = Highlighter::new(3);
        assert_eq!(highlighter.state(), SelectionState::Unselected);
        assert!(emphasized(&highlighter).is_empty());
    }

    #[test]
    fn test_select_b_after_a_leaves_only_b() {
        let mut highlighter = Highlighter::new(4);
        highlighter.select(1).unwrap();
        highlighter.select(3).unwrap();
        assert_eq!(highlighter.state(), SelectionState::Selected(3));
        assert_eq!(emphasized(&highlighter), vec![3]);
        assert_eq!(highlighter.style(1), Some(HighlightStyle::DEFAULT));
    }

    #[test]
    fn test_reselect_is_idempotent() {
        let mut highlighter = Highlighter::new(2);
        highlighter.select(0).unwrap();
        let before = highlighter.styles().to_vec();
        highlighter.select(0).unwrap();
        assert_eq!(highlighter.styles(), before.as_slice());
    }

    #[test]
    fn test_out_of_range_leaves_state_unchanged() {
        let mut highlighter = Highlighter::new(2);
        highlighter.select(1).unwrap();
        assert_eq!(
            highlighter.select(2),
            Err(SelectionError::OutOfRange { index: 2, count: 2 })
        );
        assert_eq!(highlighter.state(), SelectionState::Selected(1));
        assert_eq!(emphasized(&highlighter), vec![1]);

        let mut empty = Highlighter::new(0);
        assert!(empty.select(0).is_err());
        assert_eq!(empty.state(), SelectionState::Unselected);
    }
}
