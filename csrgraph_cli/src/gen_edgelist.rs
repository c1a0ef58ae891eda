use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, Command};
use csrgraph::generator::{DEFAULT_SEED, Distribution, Generator, MAX_SCALE, insert_weights};
use csrgraph::reader::FileKind;
use csrgraph::serialize::write_edges;
use csrgraph::{Destination, EdgeList, NodeId, NodeWeight};
use parquet::file::writer::SerializedFileWriter;
use parquet::{file::properties::WriterProperties, record::RecordWriter as _};
use parquet_derive::ParquetRecordWriter;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, ParquetRecordWriter)]
struct EdgeRecord {
    src: u32,
    dst: u32,
}

#[derive(Debug, ParquetRecordWriter)]
struct WeightedEdgeRecord {
    src: u32,
    dst: u32,
    weight: u32,
}

fn cli() -> Command {
    Command::new("gen-edgelist")
        .about("Writes a synthetic edge list to .parquet, .el or .wel")
        .arg(
            Arg::new("scale")
                .long("scale")
                .short('g')
                .required(true)
                .value_parser(clap::value_parser!(u32).range(0..=MAX_SCALE as i64))
                .help("Generate 2^scale nodes"),
        )
        .arg(
            Arg::new("degree")
                .long("degree")
                .short('k')
                .default_value("16")
                .value_parser(clap::value_parser!(usize))
                .help("Average degree"),
        )
        .arg(
            Arg::new("uniform")
                .long("uniform")
                .short('u')
                .action(ArgAction::SetTrue)
                .help("Uniform degree distribution instead of Kronecker"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .default_value("8")
                .value_parser(clap::value_parser!(u64))
                .help("Generator seed"),
        )
        .arg(
            Arg::new("weighted")
                .long("weighted")
                .short('w')
                .action(ArgAction::SetTrue)
                .help("Attach weights in [1, 255]"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Output file (.parquet, .el, .wel)"),
        )
}

fn write_parquet<D: Destination>(edges: &EdgeList<D>, output: &Path) -> Result<()> {
    let props = Arc::new(
        WriterProperties::builder()
            .set_compression(parquet::basic::Compression::SNAPPY)
            .build(),
    );
    let file = File::create(output)
        .with_context(|| format!("Error opening output file {}", output.display()))?;

    if D::WEIGHTED {
        let records: Vec<WeightedEdgeRecord> = edges
            .iter()
            .map(|e| WeightedEdgeRecord {
                src: e.u,
                dst: e.v.id(),
                weight: e.v.weight(),
            })
            .collect();
        let schema = records.as_slice().schema()?;
        let mut writer = SerializedFileWriter::new(file, schema, props)?;
        let mut row_group = writer.next_row_group()?;
        records.as_slice().write_to_row_group(&mut row_group)?;
        row_group.close()?;
        writer.close()?;
    } else {
        let records: Vec<EdgeRecord> = edges
            .iter()
            .map(|e| EdgeRecord {
                src: e.u,
                dst: e.v.id(),
            })
            .collect();
        let schema = records.as_slice().schema()?;
        let mut writer = SerializedFileWriter::new(file, schema, props)?;
        let mut row_group = writer.next_row_group()?;
        records.as_slice().write_to_row_group(&mut row_group)?;
        row_group.close()?;
        writer.close()?;
    }
    Ok(())
}

fn write_text<D: Destination>(edges: &EdgeList<D>, output: &Path) -> Result<()> {
    let file = File::create(output)
        .with_context(|| format!("Error opening output file {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    write_edges(edges, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn generate<D: Destination>(
    generator: &Generator,
    distribution: Distribution,
    seed: u64,
    output: &Path,
) -> Result<usize> {
    let kind = FileKind::from_path(output)?;
    match kind {
        FileKind::EdgeList if D::WEIGHTED => bail!("Weighted edges need a .wel or .parquet output"),
        FileKind::WeightedEdgeList if !D::WEIGHTED => {
            bail!("Unweighted edges need a .el or .parquet output")
        }
        FileKind::Serialized | FileKind::WeightedSerialized => {
            bail!("Serialized graphs are written by `csrgraph build --output`")
        }
        _ => {}
    }

    let mut edges: EdgeList<D> = generator.generate_edge_list(distribution)?;
    if D::WEIGHTED {
        insert_weights(&mut edges, seed);
    }
    info!("Generated {} edges", edges.len());

    if kind == FileKind::Parquet {
        write_parquet(&edges, output)?;
    } else {
        write_text(&edges, output)?;
    }
    Ok(edges.len())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "csrgraph=info,gen_edgelist=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let matches = cli().get_matches();
    let scale = *matches
        .get_one::<u32>("scale")
        .context("--scale is required")?;
    let degree = *matches.get_one::<usize>("degree").unwrap_or(&16);
    let seed = *matches.get_one::<u64>("seed").unwrap_or(&DEFAULT_SEED);
    let output = matches
        .get_one::<PathBuf>("output")
        .context("--output is required")?;
    let distribution = if matches.get_flag("uniform") {
        Distribution::Uniform
    } else {
        Distribution::Kronecker
    };

    let generator = Generator::new(scale, degree, seed)?;
    let written = if matches.get_flag("weighted") {
        generate::<NodeWeight>(&generator, distribution, seed, output)?
    } else {
        generate::<NodeId>(&generator, distribution, seed, output)?
    };
    println!("Successfully wrote {} edges to {}", written, output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use csrgraph::reader::{Ingested, Reader};
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn test_parquet_output_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edges.parquet");
        let generator = Generator::new(5, 4, 3).unwrap();
        let written = generate::<NodeWeight>(&generator, Distribution::Uniform, 3, &path).unwrap();
        assert_eq!(written, generator.num_edges());

        let reader = Reader::new(&path).unwrap();
        match reader.read::<NodeWeight>().unwrap() {
            Ingested::Edges { edges, has_weights } => {
                assert!(has_weights);
                assert_eq!(edges.len(), written);
                assert!(edges.iter().all(|e| (1..=255).contains(&e.v.w)));
            }
            Ingested::Graph(_) => panic!("parquet must yield edges"),
        }
    }

    #[test]
    fn test_text_output_matches_generator() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edges.el");
        let generator = Generator::new(4, 2, 1).unwrap();
        generate::<NodeId>(&generator, Distribution::Kronecker, 1, &path).unwrap();

        let expected: EdgeList<NodeId> = generator.generate_edge_list(Distribution::Kronecker).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), expected.len());
    }

    #[test]
    fn test_rejects_mismatched_suffix() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(3, 2, 1).unwrap();
        assert!(
            generate::<NodeWeight>(&generator, Distribution::Uniform, 1, &dir.path().join("g.el"))
                .is_err()
        );
        assert!(
            generate::<NodeId>(&generator, Distribution::Uniform, 1, &dir.path().join("g.wel"))
                .is_err()
        );
        assert!(
            generate::<NodeId>(&generator, Distribution::Uniform, 1, &dir.path().join("g.sg"))
                .is_err()
        );
    }

    #[test]
    fn test_scale_is_bounded_by_node_id_width() {
        let args = |scale: &str| ["gen-edgelist", "-g", scale, "-o", "g.el"].map(String::from);
        assert!(cli().try_get_matches_from(args("31")).is_ok());
        assert!(cli().try_get_matches_from(args("32")).is_err());
    }
}
