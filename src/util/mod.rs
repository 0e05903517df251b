use crate::error::Result;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub trait Transform<T> {
    /// Name of the transformation.
    fn name(&self) -> &'static str;

    /// Concise description of the transformation.
    fn description(&self) -> String;

    /// Applies the transformation to `module`.
    fn transform(&self, module: &mut T) -> Result<()>;
}

pub trait RenderGraph {
    fn render_to_str(&self) -> String;

    fn render_to_file(&self, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(self.render_to_str().as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

pub trait DumpToFile {
    fn dump_to_file(&self, path: &Path) -> Result<()>;
}

impl<T: fmt::Display> DumpToFile for T {
    fn dump_to_file(&self, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        write!(file, "{}", self)?;
        file.flush()?;
        Ok(())
    }
}
