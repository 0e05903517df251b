#[macro_use]
extern crate error_chain;
extern crate serde;
extern crate serde_yaml;

pub mod environment;
pub mod ir;
pub mod loader;
pub mod util;

pub mod error {
    error_chain! {
        types {
            Error, ErrorKind, ResultExt, Result;
        }

        foreign_links {
            IOError(::std::io::Error);
            SerdeYAML(::serde_yaml::Error);
        }

        errors {
            Analysis(m: String) {
                description("An error in the analysis")
                display("Analysis error: {}", m)
            }
            MalformedModule(m: String) {
                description("Module violates a structural invariant")
                display("Malformed module: {}", m)
            }
            Parser(m: String) {
                description("An error during parsing")
                display("Parser error: {}", m)
            }
            IdSpaceExhausted {
                description("Id space exhausted")
                display("Id space exhausted, cannot allocate fresh ids")
            }
        }
    }
}
