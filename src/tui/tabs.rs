/// Top-level view of the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Stream,
    Issues,
}

impl View {
    pub const ALL: [View; 3] = [View::Dashboard, View::Stream, View::Issues];

    pub fn title(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Stream => "Stream",
            Self::Issues => "Issues",
        }
    }
}

/// Switches between the views, wrapping at both ends
pub struct ViewTabs {
    active_index: usize,
}

impl Default for ViewTabs {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewTabs {
    pub fn new() -> Self {
        Self { active_index: 0 }
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn current(&self) -> View {
        View::ALL[self.active_index]
    }

    /// Switch to next view (wrapping)
    pub fn next_tab(&mut self) {
        self.active_index = (self.active_index + 1) % View::ALL.len();
    }

    /// Switch to previous view (wrapping)
    pub fn prev_tab(&mut self) {
        self.active_index = if self.active_index == 0 {
            View::ALL.len() - 1
        } else {
            self.active_index - 1
        };
    }

    pub fn select(&mut self, view: View) {
        if let Some(index) = View::ALL.iter().position(|v| *v == view) {
            self.active_index = index;
        }
    }

    /// Select by zero-based index; out of range is ignored
    pub fn select_index(&mut self, index: usize) {
        if index < View::ALL.len() {
            self.active_index = index;
        }
    }

    pub fn titles(&self) -> impl Iterator<Item = &'static str> {
        View::ALL.iter().map(|v| v.title())
    }
}
