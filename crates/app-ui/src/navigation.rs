//! Navigation model for the storefront
//!
//! This module provides:
//! - Route definitions for the storefront screens
//! - Tab navigation
//! - Per-tab navigation stacks
//! - Navigation state management
//!
//! Routes carry only what a navigation event needs. Data a destination
//! screen loads is identified by [`Route::prefetch_key`] and fetched through
//! the query layer, never passed between screens.

use app_state::QueryKey;
use serde::{Deserialize, Serialize};

// =============================================================================
// Route Definitions
// =============================================================================

/// All screens of the storefront
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "route", content = "params")]
pub enum Route {
    /// Storefront landing page
    #[default]
    Home,
    /// Product listing for a category
    Category {
        /// Category ID
        id: String,
    },
    /// Product detail
    Product {
        /// Product ID
        id: String,
    },
    /// Search results
    Search {
        /// Search query
        #[serde(skip_serializing_if = "Option::is_none")]
        q: Option<String>,
    },
    /// Shopping cart
    Cart,
    /// Checkout flow
    Checkout,
    /// Account profile
    Profile,
    /// Past order detail
    Order {
        /// Order ID
        id: String,
    },
}

impl Route {
    /// Get the title for this route
    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Category { .. } => "Category",
            Route::Product { .. } => "Product",
            Route::Search { .. } => "Search",
            Route::Cart => "Cart",
            Route::Checkout => "Checkout",
            Route::Profile => "Profile",
            Route::Order { .. } => "Order",
        }
    }

    /// Query the destination screen needs first, if it loads remote data
    pub fn prefetch_key(&self) -> Option<QueryKey> {
        match self {
            Route::Home => Some(QueryKey::new("home", "featured")),
            Route::Category { id } => Some(QueryKey::new("category", id.as_str())),
            Route::Product { id } => Some(QueryKey::new("product", id.as_str())),
            Route::Search { q: Some(q) } if !q.trim().is_empty() => {
                Some(QueryKey::new("search", "results").with_param("q", q.trim()))
            }
            Route::Search { .. } => None,
            Route::Order { id } => Some(QueryKey::new("order", id.as_str())),
            Route::Cart | Route::Checkout | Route::Profile => None,
        }
    }
}

// =============================================================================
// Navigation Tabs
// =============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NavigationTab {
    /// Browsing tab
    #[default]
    Shop,
    /// Search tab
    Search,
    /// Cart tab
    Cart,
    /// Account tab
    Profile,
}

impl NavigationTab {
    /// Get the root route for this tab
    pub fn root_route(&self) -> Route {
        match self {
            NavigationTab::Shop => Route::Home,
            NavigationTab::Search => Route::Search { q: None },
            NavigationTab::Cart => Route::Cart,
            NavigationTab::Profile => Route::Profile,
        }
    }

    fn index(self) -> usize {
        match self {
            NavigationTab::Shop => 0,
            NavigationTab::Search => 1,
            NavigationTab::Cart => 2,
            NavigationTab::Profile => 3,
        }
    }

    /// Get all tabs in order
    pub fn all() -> [NavigationTab; 4] {
        [
            NavigationTab::Shop,
            NavigationTab::Search,
            NavigationTab::Cart,
            NavigationTab::Profile,
        ]
    }
}

// =============================================================================
// Navigation Stack
// =============================================================================

/// A navigation stack entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackEntry {
    /// The route
    pub route: Route,
    /// Unique key for this screen instance
    pub key: String,
}

impl StackEntry {
    /// Create a new stack entry
    pub fn new(route: Route) -> Self {
        Self {
            route,
            key: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Navigation stack for a tab. Never empty: the root entry cannot be popped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationStack {
    /// Entries above the root (bottom to top)
    above: Vec<StackEntry>,
    /// Root entry
    root: StackEntry,
}

impl NavigationStack {
    /// Create a new navigation stack with a root route
    pub fn new(root: Route) -> Self {
        Self {
            above: Vec::new(),
            root: StackEntry::new(root),
        }
    }

    /// Push a route onto the stack, returning the new entry's key
    pub fn push(&mut self, route: Route) -> String {
        let entry = StackEntry::new(route);
        let key = entry.key.clone();
        self.above.push(entry);
        key
    }

    /// Pop the top entry; `None` at the root
    pub fn pop(&mut self) -> Option<StackEntry> {
        self.above.pop()
    }

    /// Get the current (top) route
    pub fn current(&self) -> &Route {
        &self.current_entry().route
    }

    /// Get the current stack entry
    pub fn current_entry(&self) -> &StackEntry {
        self.above.last().unwrap_or(&self.root)
    }

    /// Check if we can go back
    pub fn can_go_back(&self) -> bool {
        !self.above.is_empty()
    }

    /// Get stack depth
    pub fn depth(&self) -> usize {
        self.above.len() + 1
    }
}

// =============================================================================
// Navigation State
// =============================================================================

/// Complete navigation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationState {
    /// Current active tab
    pub active_tab: NavigationTab,
    /// One stack per tab, in [`NavigationTab::all`] order
    tab_stacks: [NavigationStack; 4],
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            active_tab: NavigationTab::Shop,
            tab_stacks: NavigationTab::all().map(|tab| NavigationStack::new(tab.root_route())),
        }
    }
}

impl NavigationState {
    /// Create a new navigation state
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack of a tab
    pub fn stack(&self, tab: NavigationTab) -> &NavigationStack {
        &self.tab_stacks[tab.index()]
    }

    /// Get the current stack for the active tab
    pub fn current_stack(&self) -> &NavigationStack {
        self.stack(self.active_tab)
    }

    fn current_stack_mut(&mut self) -> &mut NavigationStack {
        &mut self.tab_stacks[self.active_tab.index()]
    }

    /// Get the current route
    pub fn current_route(&self) -> &Route {
        self.current_stack().current()
    }

    /// Key of the focused screen instance
    pub fn current_key(&self) -> &str {
        &self.current_stack().current_entry().key
    }

    /// Push a route on the active tab, returning the new entry's key
    pub fn navigate(&mut self, route: Route) -> String {
        self.current_stack_mut().push(route)
    }

    /// Pop the active tab's top entry
    pub fn go_back(&mut self) -> Option<StackEntry> {
        self.current_stack_mut().pop()
    }

    /// Switch to a tab
    pub fn switch_tab(&mut self, tab: NavigationTab) {
        self.active_tab = tab;
    }

    /// Check if we can go back
    pub fn can_go_back(&self) -> bool {
        self.current_stack().can_go_back()
    }
}

// =============================================================================
// Tests
// =============================================================================
