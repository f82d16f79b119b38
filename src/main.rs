//! CLI front-end for the four top-k shortest diverse paths search engines.

use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};

use divpaths::engine::PathFinder;
use divpaths::ingest::{self, Format};
use divpaths::{Graph, IterBound, Kspd, KspdMinus, Path, Yen};

#[derive(serde::Serialize)]
struct PathRecord {
    route: Vec<usize>,
    length: f64,
}

impl From<&Path> for PathRecord {
    fn from(p: &Path) -> Self {
        Self {
            route: p.route.clone(),
            length: p.length.raw(),
        }
    }
}

fn graph_arg() -> Arg<'static, 'static> {
    Arg::with_name("graph")
        .takes_value(true)
        .required(true)
        .index(1)
        .help("Graph file (edge list, DIMACS, or either gzip-compressed)")
}

fn src_arg() -> Arg<'static, 'static> {
    Arg::with_name("src").takes_value(true).required(true).index(2).help("Source vertex")
}

fn dest_arg() -> Arg<'static, 'static> {
    Arg::with_name("dest").takes_value(true).required(true).index(3).help("Destination vertex")
}

fn k_arg() -> Arg<'static, 'static> {
    Arg::with_name("k").takes_value(true).required(true).index(4).help("Number of paths to find")
}

fn format_arg() -> Arg<'static, 'static> {
    Arg::with_name("format")
        .short("f")
        .long("format")
        .takes_value(true)
        .possible_values(&["edge-list", "snap", "dimacs"])
        .default_value("edge-list")
        .help("Graph file format")
}

fn threshold_arg() -> Arg<'static, 'static> {
    Arg::with_name("threshold")
        .short("t")
        .long("threshold")
        .takes_value(true)
        .default_value("0.5")
        .help("Diversity threshold, strictly between 0 and 1")
}

fn output_arg() -> Arg<'static, 'static> {
    Arg::with_name("output")
        .short("o")
        .long("output")
        .takes_value(true)
        .help("Output JSON file; prints to stdout if omitted")
}

fn search_subcommand(name: &'static str, about: &'static str, with_threshold: bool) -> App<'static, 'static> {
    let mut cmd = SubCommand::with_name(name)
        .about(about)
        .arg(graph_arg())
        .arg(src_arg())
        .arg(dest_arg())
        .arg(k_arg())
        .arg(format_arg())
        .arg(output_arg());
    if with_threshold {
        cmd = cmd.arg(threshold_arg());
    }
    cmd
}

fn format_of(matches: &ArgMatches) -> Format {
    match matches.value_of("format").unwrap() {
        "dimacs" => Format::Dimacs,
        "snap" => Format::SnapEdgeList,
        _ => Format::EdgeList,
    }
}

fn load_graph(matches: &ArgMatches) -> Graph {
    let path = std::path::Path::new(matches.value_of("graph").unwrap());
    log::info!("loading graph from {}", path.display());
    let graph = ingest::load_graph_file(path, format_of(matches)).expect("graph input is malformed");
    log::debug!("graph has {} vertices", graph.node_count());
    graph
}

fn write_results(matches: &ArgMatches, results: Vec<Path>) {
    log::info!("found {} path(s)", results.len());
    let records: Vec<PathRecord> = results.iter().map(PathRecord::from).collect();
    match matches.value_of("output") {
        Some(path) => {
            serde_json::to_writer(&std::fs::File::create(path).expect("cannot create output file"), &records).unwrap();
        }
        None => {
            serde_json::to_writer(std::io::stdout(), &records).unwrap();
            println!();
        }
    }
}

fn src_dest_k(matches: &ArgMatches) -> (usize, usize, usize) {
    let src = matches.value_of("src").unwrap().parse().expect("src must be a vertex id");
    let dest = matches.value_of("dest").unwrap().parse().expect("dest must be a vertex id");
    let k = matches.value_of("k").unwrap().parse().expect("k must be a non-negative integer");
    (src, dest, k)
}

fn threshold(matches: &ArgMatches) -> f64 {
    matches.value_of("threshold").unwrap().parse().expect("threshold must be a number")
}

fn main() {
    env_logger::init_from_env(env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"));

    let matches = App::new("divpaths")
        .version(crate_version!())
        .about("Top-k shortest diverse paths over a weighted directed graph")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(search_subcommand("kspd", "KSPD: class-indexed branching with LB1/LB2 pruning", true))
        .subcommand(search_subcommand("kspd-minus", "KSPD⁻: ablation baseline, LB1 pruning only", true))
        .subcommand(search_subcommand("kspd-yen", "KSPD-Yen: classical Yen enumeration with a Jaccard post-filter", true))
        .subcommand(search_subcommand("iterbound", "IterBound: top-k shortest paths, no diversity", false))
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("kspd") {
        let graph = load_graph(matches);
        let (src, dest, k) = src_dest_k(matches);
        let mut engine = Kspd::new(graph, threshold(matches)).expect("invalid threshold");
        let results = engine.find_paths(src, dest, k).expect("search failed");
        log::debug!("explored {} candidates", engine.number_of_paths_explored());
        write_results(matches, results);
    } else if let Some(matches) = matches.subcommand_matches("kspd-minus") {
        let graph = load_graph(matches);
        let (src, dest, k) = src_dest_k(matches);
        let mut engine = KspdMinus::new(graph, threshold(matches)).expect("invalid threshold");
        let results = engine.find_paths(src, dest, k).expect("search failed");
        log::debug!("explored {} candidates", engine.number_of_paths_explored());
        write_results(matches, results);
    } else if let Some(matches) = matches.subcommand_matches("kspd-yen") {
        let graph = load_graph(matches);
        let (src, dest, k) = src_dest_k(matches);
        let mut engine = Yen::new(graph, threshold(matches)).expect("invalid threshold");
        let results = engine.find_paths(src, dest, k).expect("search failed");
        log::debug!("explored {} candidates", engine.number_of_paths_explored());
        write_results(matches, results);
    } else if let Some(matches) = matches.subcommand_matches("iterbound") {
        let graph = load_graph(matches);
        let (src, dest, k) = src_dest_k(matches);
        let mut engine = IterBound::new(graph);
        let results = engine.find_paths(src, dest, k).expect("search failed");
        if engine.resource_exhausted() {
            log::warn!("iterbound hit its iteration cap; returning a partial result");
        }
        log::debug!("explored {} candidates", engine.number_of_paths_explored());
        write_results(matches, results);
    }
}
