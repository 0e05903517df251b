use crate::environment::{Environment, OptimizationLevel};
use crate::error::Result;
use crate::ir::Module;
use crate::util::Transform;

mod function_inlining;

pub use function_inlining::FunctionInlining;

#[derive(Debug, Eq, PartialEq)]
pub enum OptimizationResult {
    Changed,
    Unchanged,
}

pub trait Optimization {
    fn optimize(&self, module: &mut Module) -> Result<OptimizationResult>;
}

pub struct Optimizer {
    optimizations: Vec<Box<dyn Optimization>>,
    repetitions: usize,
}

impl Optimizer {
    pub fn new_from_env(env: &Environment) -> Self {
        match env.optimization_level {
            OptimizationLevel::Disabled => Self::none(),
            OptimizationLevel::Basic => Self::basic(),
            OptimizationLevel::Full => Self::full(),
        }
    }

    pub fn none() -> Self {
        Self {
            optimizations: Vec::new(),
            repetitions: 0,
        }
    }

    pub fn basic() -> Self {
        Self {
            optimizations: vec![Box::new(FunctionInlining::new())],
            repetitions: 1,
        }
    }

    pub fn full() -> Self {
        Self {
            optimizations: vec![Box::new(FunctionInlining::new())],
            repetitions: 2,
        }
    }
}

impl Transform<Module> for Optimizer {
    fn name(&self) -> &'static str {
        "Optimization"
    }

    fn description(&self) -> String {
        "Optimize".to_string()
    }

    fn transform(&self, module: &mut Module) -> Result<()> {
        for _ in 1..=self.repetitions {
            let mut unchanged = true;

            for optimization in &self.optimizations {
                let result = optimization.optimize(module)?;
                if result == OptimizationResult::Changed {
                    unchanged = false;
                }
            }

            if unchanged {
                break;
            }
        }

        Ok(())
    }
}
