use anyhow::Context;
use stage::mesh::{Mesh, obj};
use std::path::Path;

/// Unit cube, used when no OBJ file is given on the command line.
pub const FALLBACK_CUBE: &str = "\
v -0.5 -0.5 0.5
v 0.5 -0.5 0.5
v 0.5 0.5 0.5
v -0.5 0.5 0.5
v -0.5 -0.5 -0.5
v 0.5 -0.5 -0.5
v 0.5 0.5 -0.5
v -0.5 0.5 -0.5
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
vn 0 0 -1
vn 1 0 0
vn -1 0 0
vn 0 1 0
vn 0 -1 0
f 1/1/1 2/2/1 3/3/1 4/4/1
f 6/1/2 5/2/2 8/3/2 7/4/2
f 2/1/3 6/2/3 7/3/3 3/4/3
f 5/1/4 1/2/4 4/3/4 8/4/4
f 4/1/5 3/2/5 7/3/5 8/4/5
f 5/1/6 6/2/6 2/3/6 1/4/6
";

pub fn load_obj<P: AsRef<Path>>(path: P) -> anyhow::Result<Mesh> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    obj::import(&source).with_context(|| format!("importing {}", path.display()))
}

pub fn load_fallback() -> anyhow::Result<Mesh> {
    Ok(obj::import(FALLBACK_CUBE)?)
}
