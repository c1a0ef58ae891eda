use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use csrgraph::generator::{DEFAULT_DEGREE, DEFAULT_SEED, Distribution, MAX_SCALE};
use csrgraph::reader::FileKind;
use csrgraph::serialize::{save_graph, write_graph_edges};
use csrgraph::{
    BuildOptions, CsrGraph, Destination, EdgeSource, GraphBuilder, GraphError, NodeId, NodeWeight,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn cli() -> Command {
    Command::new("csrgraph")
        .about("Builds CSR graphs from edge lists")
        .subcommand_required(true)
        .subcommand(
            Command::new("build")
                .about("Build a graph from a file or a synthetic generator")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .short('f')
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Edge list (.el, .wel, .parquet) or serialized graph (.sg, .wsg)"),
                )
                .arg(
                    Arg::new("scale")
                        .long("scale")
                        .short('g')
                        .value_parser(clap::value_parser!(u32).range(0..=MAX_SCALE as i64))
                        .help("Generate 2^scale nodes"),
                )
                .arg(
                    Arg::new("uniform")
                        .long("uniform")
                        .short('u')
                        .action(ArgAction::SetTrue)
                        .help("Uniform degree distribution instead of Kronecker"),
                )
                .arg(
                    Arg::new("degree")
                        .long("degree")
                        .short('k')
                        .default_value("16")
                        .value_parser(clap::value_parser!(usize))
                        .help("Average degree of generated graphs"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("8")
                        .value_parser(clap::value_parser!(u64))
                        .help("Seed for generated edges and weights"),
                )
                .group(
                    ArgGroup::new("source")
                        .args(["file", "scale"])
                        .required(true),
                )
                .args(shared_build_args())
                .arg(
                    Arg::new("relabel")
                        .long("relabel")
                        .short('r')
                        .action(ArgAction::SetTrue)
                        .help("Relabel nodes by descending degree (undirected only)"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Write the graph (.sg, .wsg, .el, .wel)"),
                )
                .arg(
                    Arg::new("print-topology")
                        .long("print-topology")
                        .short('p')
                        .action(ArgAction::SetTrue)
                        .help("Print every node's neighbors"),
                ),
        )
        .subcommand(
            Command::new("stats")
                .about("Load a graph and print degree statistics")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .short('f')
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Edge list or serialized graph"),
                )
                .args(shared_build_args()),
        )
}

fn shared_build_args() -> Vec<Arg> {
    vec![
        Arg::new("symmetrize")
            .long("symmetrize")
            .short('s')
            .action(ArgAction::SetTrue)
            .help("Treat edges as undirected"),
        Arg::new("weighted")
            .long("weighted")
            .short('w')
            .action(ArgAction::SetTrue)
            .help("Build a weighted graph"),
        Arg::new("no-invert")
            .long("no-invert")
            .action(ArgAction::SetTrue)
            .help("Skip the incoming adjacency of directed graphs"),
        Arg::new("num-nodes")
            .long("num-nodes")
            .short('n')
            .value_parser(clap::value_parser!(usize))
            .help("Node count (default: largest id + 1)"),
    ]
}

fn build_options(matches: &ArgMatches) -> BuildOptions {
    BuildOptions {
        symmetrize: matches.get_flag("symmetrize"),
        invert: !matches.get_flag("no-invert"),
        num_nodes: matches.get_one::<usize>("num-nodes").copied(),
        weight_seed: matches
            .try_get_one::<u64>("seed")
            .ok()
            .flatten()
            .copied()
            .unwrap_or(DEFAULT_SEED),
    }
}

fn edge_source(matches: &ArgMatches) -> Result<EdgeSource> {
    if let Some(path) = matches.get_one::<PathBuf>("file") {
        return Ok(EdgeSource::File(path.clone()));
    }
    let Some(&scale) = matches.get_one::<u32>("scale") else {
        bail!("Either --file or --scale is required");
    };
    let distribution = if matches.get_flag("uniform") {
        Distribution::Uniform
    } else {
        Distribution::Kronecker
    };
    Ok(EdgeSource::Synthetic {
        scale,
        degree: *matches.get_one::<usize>("degree").unwrap_or(&DEFAULT_DEGREE),
        distribution,
        seed: *matches.get_one::<u64>("seed").unwrap_or(&DEFAULT_SEED),
    })
}

fn handle_build<D: Destination>(matches: &ArgMatches) -> Result<()> {
    let builder: GraphBuilder<D> = GraphBuilder::new(build_options(matches));
    let source = edge_source(matches)?;
    let mut graph = builder.build(&source)?;
    graph.log_stats();

    if matches.get_flag("relabel") {
        graph = builder.relabel(&graph)?;
    }

    if matches.get_flag("print-topology") {
        print!("{}", graph.topology());
    }

    if let Some(output) = matches.get_one::<PathBuf>("output") {
        write_output(&graph, output)?;
        println!("Successfully wrote graph to {}", output.display());
    }
    Ok(())
}

fn write_output<D: Destination>(graph: &CsrGraph<D>, output: &Path) -> Result<()> {
    let kind = FileKind::from_path(output)?;
    let weighted_file = match kind {
        FileKind::Serialized | FileKind::EdgeList => false,
        FileKind::WeightedSerialized | FileKind::WeightedEdgeList => true,
        FileKind::Parquet => bail!("Parquet output is produced by gen-edgelist"),
    };
    if weighted_file != D::WEIGHTED {
        bail!(
            "Output {} does not match a {} graph; use .{}",
            output.display(),
            if D::WEIGHTED { "weighted" } else { "unweighted" },
            match (kind.is_serialized(), D::WEIGHTED) {
                (true, true) => "wsg",
                (true, false) => "sg",
                (false, true) => "wel",
                (false, false) => "el",
            }
        );
    }

    if kind.is_serialized() {
        return save_graph(graph, output);
    }
    let out_file = File::create(output)
        .with_context(|| format!("Error opening output file {}", output.display()))?;
    let mut writer = BufWriter::new(out_file);
    write_graph_edges(graph, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn handle_stats<D: Destination>(matches: &ArgMatches) -> Result<()> {
    let builder: GraphBuilder<D> = GraphBuilder::new(build_options(matches));
    let source = edge_source(matches)?;
    let graph = builder.build(&source)?;

    let num_nodes = graph.num_nodes();
    let degrees: Vec<usize> = (0..num_nodes as NodeId)
        .map(|n| graph.out_degree(n))
        .collect();
    let max_degree = degrees.iter().copied().max().unwrap_or(0);
    let isolated = degrees.iter().filter(|&&d| d == 0).count();

    println!(
        "{} graph: {} nodes, {} edges ({} directed slots)",
        if graph.is_directed() { "Directed" } else { "Undirected" },
        num_nodes,
        graph.num_edges(),
        graph.num_edges_directed()
    );
    println!(" - weighted: {}", graph.is_weighted());
    println!(" - max out-degree: {}", max_degree);
    println!(" - isolated nodes: {}", isolated);
    if graph.is_directed() {
        println!(" - incoming adjacency: {}", graph.has_incoming());
    }
    Ok(())
}

fn init_threads() -> Result<()> {
    if let Ok(threads) = std::env::var("CSRGRAPH_THREADS") {
        let num_threads: usize = threads
            .parse()
            .with_context(|| format!("Invalid CSRGRAPH_THREADS value {:?}", threads))?;
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()?;
        info!("Using {} worker threads", num_threads);
    }
    Ok(())
}

fn run() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "csrgraph=info,csrgraph_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    init_threads()?;

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("build", sub_m)) => {
            if sub_m.get_flag("weighted") {
                handle_build::<NodeWeight>(sub_m)
            } else {
                handle_build::<NodeId>(sub_m)
            }
        }
        Some(("stats", sub_m)) => {
            if sub_m.get_flag("weighted") {
                handle_stats::<NodeWeight>(sub_m)
            } else {
                handle_stats::<NodeId>(sub_m)
            }
        }
        _ => bail!("No valid subcommand provided. Use --help for usage."),
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        let code = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<GraphError>())
            .map_or(1, GraphError::exit_code);
        std::process::exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csrgraph::Edge;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn test_build_requires_a_source() {
        assert!(cli().try_get_matches_from(["csrgraph", "build"]).is_err());
        assert!(
            cli()
                .try_get_matches_from(["csrgraph", "build", "-f", "a.el", "-g", "3"])
                .is_err()
        );
    }

    #[test]
    fn test_synthetic_source_from_args() {
        let matches = cli()
            .try_get_matches_from(["csrgraph", "build", "-g", "4", "-u", "-k", "8", "-s"])
            .unwrap();
        let (_, sub_m) = matches.subcommand().unwrap();
        assert_eq!(
            edge_source(sub_m).unwrap(),
            EdgeSource::Synthetic {
                scale: 4,
                degree: 8,
                distribution: Distribution::Uniform,
                seed: DEFAULT_SEED,
            }
        );
        let options = build_options(sub_m);
        assert!(options.symmetrize);
        assert!(options.invert);
        assert_eq!(options.num_nodes, None);
    }

    #[test]
    fn test_stats_options() {
        let matches = cli()
            .try_get_matches_from(["csrgraph", "stats", "-f", "g.sg", "--no-invert", "-n", "7"])
            .unwrap();
        let (_, sub_m) = matches.subcommand().unwrap();
        assert_eq!(
            edge_source(sub_m).unwrap(),
            EdgeSource::File(PathBuf::from("g.sg"))
        );
        let options = build_options(sub_m);
        assert!(!options.invert);
        assert_eq!(options.num_nodes, Some(7));
        assert_eq!(options.weight_seed, DEFAULT_SEED);
    }

    #[test]
    fn test_relabel_error_maps_to_exit_code() {
        let err: anyhow::Error = anyhow::Error::new(GraphError::RelabelDirected).context("relabel");
        let code = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<GraphError>())
            .map_or(1, GraphError::exit_code);
        assert_eq!(code, -11);
    }

    #[test]
    fn test_scale_is_bounded_by_node_id_width() {
        assert!(cli().try_get_matches_from(["csrgraph", "build", "-g", "31"]).is_ok());
        assert!(cli().try_get_matches_from(["csrgraph", "build", "-g", "32"]).is_err());
        assert!(cli().try_get_matches_from(["csrgraph", "build", "-g", "64"]).is_err());
    }

    #[test]
    fn test_text_output_suffix_must_match_weights() {
        let dir = TempDir::new().unwrap();
        let g: CsrGraph<NodeId> = GraphBuilder::new(BuildOptions::default())
            .build_squished(vec![Edge::new(0, 1)], false);
        assert!(write_output(&g, &dir.path().join("g.wel")).is_err());
        assert!(!dir.path().join("g.wel").exists());
        write_output(&g, &dir.path().join("g.el")).unwrap();
        let text = std::fs::read_to_string(dir.path().join("g.el")).unwrap();
        assert_eq!(text, "0 1\n");

        let wg: CsrGraph<NodeWeight> = GraphBuilder::new(BuildOptions::default())
            .build_squished(vec![Edge::new(0, NodeWeight::new(1, 3))], true);
        assert!(write_output(&wg, &dir.path().join("g.el")).is_err());
        assert!(write_output(&wg, &dir.path().join("g.sg")).is_err());
        write_output(&wg, &dir.path().join("g.wel")).unwrap();
        let text = std::fs::read_to_string(dir.path().join("g.wel")).unwrap();
        assert_eq!(text, "0 1 3\n");
    }
}
