/// A route table and a request path to resolve against it.
#[derive(Debug, Copy, Clone)]
pub struct RouteCase {
    name: &'static str,
    group: RouteGroup,
    table: RouteTable,
    path: &'static str,
}

impl RouteCase {
    pub fn new(name: &'static str, group: RouteGroup, table: RouteTable, path: &'static str) -> Self {
        Self { name, group, table, path }
    }

    pub fn small(name: &'static str, table: RouteTable, path: &'static str) -> Self {
        Self::new(name, RouteGroup::Small, table, path)
    }

    pub fn large(name: &'static str, table: RouteTable, path: &'static str) -> Self {
        Self::new(name, RouteGroup::Large, table, path)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> RouteGroup {
        self.group
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

/// Declared paths, registered in order.
#[derive(Debug, Copy, Clone)]
pub struct RouteTable {
    name: &'static str,
    paths: &'static [&'static str],
}

impl RouteTable {
    pub const fn new(name: &'static str, paths: &'static [&'static str]) -> Self {
        Self { name, paths }
    }

    pub fn paths(&self) -> &'static [&'static str] {
        self.paths
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[derive(Clone, Copy, Debug)]
pub enum RouteGroup {
    Small,
    Large,
}
