mod route_table;

pub use route_table::{CompiledRoute, RouteTable};
