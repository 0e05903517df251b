#[macro_use]
extern crate clap;
use clap::{Arg, ArgMatches};
use colored::*;
use console::style;
use shiropt::environment;
use shiropt::error::Result;
use shiropt::ir;
use shiropt::loader;
use shiropt::util::{DumpToFile, RenderGraph, Transform, Validate};
use std::path::Path;
use std::process;

fn main() {
    let arguments = app_from_crate!()
        .arg(
            Arg::with_name("environment_file")
                .short("e")
                .long("env")
                .value_name("FILE")
                .help("Sets environment file to use")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("optimization_level")
                .short("o")
                .long("opt")
                .value_name("LEVEL")
                .possible_values(&["none", "basic", "full"])
                .help("Sets optimization level (overwrites environment)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("skip_validation")
                .long("skip-validation")
                .help("Skips validation of the optimized module"),
        )
        .arg(
            Arg::with_name("debug")
                .short("d")
                .long("debug")
                .help("Enables debug mode"),
        )
        .arg(
            Arg::with_name("cfg_file")
                .long("cfg")
                .value_name("FILE")
                .help("Prints CFG into the file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("output_file")
                .long("output")
                .value_name("FILE")
                .help("Writes the optimized module into the file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("input_file")
                .value_name("FILE")
                .help("Module to be optimized")
                .required(true)
                .index(1),
        )
        .get_matches();

    if let Err(e) = shiropt(&arguments) {
        println!("{}", style(e).bold().red());
        process::exit(-1);
    }
}

fn build_environment(arguments: &ArgMatches) -> Result<environment::Environment> {
    use environment::*;

    let mut env_builder = EnvironmentBuilder::default();

    if let Some(file_path) = arguments.value_of("environment_file") {
        // Load given environment file
        let env_file = Path::new(file_path);
        if !env_file.is_file() {
            return Err(format!("Environment file '{}' does not exist", file_path).into());
        }
        env_builder.from_file(env_file)?;
    } else {
        // Try to find an environment file for the current input
        let input_file = Path::new(arguments.value_of("input_file").unwrap());
        let env_file = input_file.with_extension("yaml");
        if env_file.is_file() {
            // Environment file exists, use it
            println!(
                "Using environment defined in '{}'",
                style(env_file.display()).yellow()
            );
            env_builder.from_file(&env_file)?;
        }
    }

    if let Some(level) = arguments.value_of("optimization_level") {
        env_builder.optimization_level(match level {
            "none" => OptimizationLevel::Disabled,
            "basic" => OptimizationLevel::Basic,
            "full" => OptimizationLevel::Full,
            _ => panic!("unknown optimization level"),
        });
    }

    if arguments.is_present("skip_validation") {
        env_builder.validate(false);
    }

    if arguments.is_present("debug") {
        env_builder.debug(true);
    }

    Ok(env_builder.build()?)
}

fn optimize_module(env: &environment::Environment, module: &mut ir::Module) -> Result<()> {
    use ir::optimization::Optimizer;

    let optimizer = Optimizer::new_from_env(env);
    optimizer.transform(module)?;

    Ok(())
}

fn shiropt(arguments: &ArgMatches) -> Result<()> {
    let input_file = arguments.value_of("input_file").unwrap();

    let env = build_environment(arguments)?;

    if env.debug {
        println!("{}:\n{}\n---", "Environment".bold(), style(&env).cyan());
    }

    println!(
        "{} Loading module '{}'",
        style("[1/4]").bold().dim(),
        input_file.yellow()
    );
    let mut module = loader::load_module(Path::new(input_file))?;

    if let Some(path) = arguments.value_of("cfg_file") {
        module.render_to_file(Path::new(path))?;
    }

    println!("{} Optimizing module", style("[2/4]").bold().dim());
    optimize_module(&env, &mut module)?;

    if env.validate {
        println!("{} Validating module", style("[3/4]").bold().dim());
        module.validate()?;
    }

    match arguments.value_of("output_file") {
        Some(path) => {
            println!(
                "{} Writing module to '{}'",
                style("[4/4]").bold().dim(),
                path.yellow()
            );
            module.dump_to_file(Path::new(path))?;
        }
        None => {
            println!("{} Optimized module:", style("[4/4]").bold().dim());
            println!("{}", module);
        }
    }

    println!("{}", "Module optimized.".bold().green());

    Ok(())
}
