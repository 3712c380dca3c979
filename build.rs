//! Locates MPI, compiles `csrc/mpitrace.c` and links the result.
//!
//! Probes, first hit wins: `MPI_PKG_CONFIG`, the usual pkg-config names,
//! the compiler wrapper (`MPICC`, default `mpicc`), `MPI_HOME`,
//! `CRAY_MPICH_DIR`, then a few install prefixes. Every candidate must
//! provide `mpi.h`; a wrapper or pkg-config entry that reports no include
//! directory is trusted to use the compiler's default search path.
//!
//! The shim calls the public `MPI_*` symbols, so a PMPI tracer linked or
//! preloaded into the job sees every call the suite makes.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const PKG_CONFIG_NAMES: &[&str] = &["mpich", "ompi-c", "ompi", "mpi"];
const PREFIXES: &[&str] = &[
    "/usr",
    "/usr/local",
    "/opt/mpich",
    "/opt/openmpi",
    "/usr/lib/x86_64-linux-gnu/openmpi",
];

/// A usable MPI installation.
struct Install {
    /// Where it was found, exported to the crate for its startup log line.
    origin: String,
    include_dirs: Vec<PathBuf>,
    lib_dirs: Vec<PathBuf>,
    libs: Vec<String>,
}

impl Install {
    fn at_prefix(origin: String, prefix: &Path) -> Option<Install> {
        let include = prefix.join("include");
        if !include.join("mpi.h").is_file() {
            return None;
        }
        let lib_dir = ["lib64", "lib"]
            .iter()
            .map(|dir| prefix.join(dir))
            .find(|dir| dir.is_dir())?;
        Some(Install {
            origin,
            include_dirs: vec![include],
            lib_dirs: vec![lib_dir],
            libs: vec!["mpi".to_owned()],
        })
    }

    /// Reported include directories, if any, must contain `mpi.h`.
    fn header_found(&self) -> bool {
        self.include_dirs.is_empty()
            || self
                .include_dirs
                .iter()
                .any(|dir| dir.join("mpi.h").is_file())
    }
}

fn main() {
    for file in ["csrc/mpitrace.c", "csrc/mpitrace.h"] {
        println!("cargo:rerun-if-changed={file}");
    }
    for var in ["MPI_PKG_CONFIG", "MPICC", "MPI_HOME", "CRAY_MPICH_DIR"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    let install = match locate() {
        Some(install) => install,
        None => panic!(
            "no MPI installation with mpi.h found; set MPI_PKG_CONFIG to a \
             pkg-config name, MPICC to a compiler wrapper, or MPI_HOME to an install prefix"
        ),
    };
    println!("cargo:warning=mpitrace: using MPI from {}", install.origin);

    let mut shim = cc::Build::new();
    shim.file("csrc/mpitrace.c")
        .include("csrc")
        .includes(&install.include_dirs)
        .warnings(true)
        .extra_warnings(true);
    if env::var_os("CARGO_FEATURE_DEBUG").is_some() {
        shim.define("MPITRACE_DEBUG", None);
    }
    shim.compile("mpitrace");

    for dir in &install.lib_dirs {
        println!("cargo:rustc-link-search=native={}", dir.display());
        println!("cargo:rustc-link-arg=-Wl,-rpath,{}", dir.display());
    }
    for lib in &install.libs {
        println!("cargo:rustc-link-lib={lib}");
    }
    println!("cargo:rustc-env=MPITRACE_BUILD_MPI={}", install.origin);
}

fn locate() -> Option<Install> {
    let requested = env::var("MPI_PKG_CONFIG").ok();
    let from_pkg_config = requested
        .iter()
        .map(String::as_str)
        .chain(PKG_CONFIG_NAMES.iter().copied())
        .find_map(pkg_config_install);

    from_pkg_config
        .or_else(wrapper_install)
        .or_else(|| env_prefix_install("MPI_HOME"))
        .or_else(|| env_prefix_install("CRAY_MPICH_DIR"))
        .or_else(|| {
            PREFIXES.iter().find_map(|prefix| {
                Install::at_prefix(format!("prefix {prefix}"), Path::new(prefix))
            })
        })
}

fn pkg_config_install(name: &str) -> Option<Install> {
    let lib = pkg_config::Config::new()
        .cargo_metadata(false)
        .probe(name)
        .ok()?;
    let install = Install {
        origin: format!("pkg-config {name} {}", lib.version),
        include_dirs: lib.include_paths,
        lib_dirs: lib.link_paths,
        libs: lib.libs,
    };
    install.header_found().then_some(install)
}

fn env_prefix_install(var: &str) -> Option<Install> {
    let prefix = env::var_os(var)?;
    let origin = format!("{var}={}", prefix.to_string_lossy());
    let install = Install::at_prefix(origin, Path::new(&prefix));
    if install.is_none() {
        println!("cargo:warning=mpitrace: {var} is set but has no include/mpi.h");
    }
    install
}

/// Ask the compiler wrapper for its flags. MPICH answers `-show`,
/// Open MPI `--showme`.
fn wrapper_install() -> Option<Install> {
    let wrapper = env::var("MPICC").unwrap_or_else(|_| "mpicc".to_owned());
    let flags = ["-show", "--showme"].iter().find_map(|flag| {
        let output = Command::new(&wrapper).arg(flag).output().ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
    })?;
    let install = from_wrapper_flags(&wrapper, &flags);
    install.header_found().then_some(install)
}

fn from_wrapper_flags(wrapper: &str, flags: &str) -> Install {
    let mut install = Install {
        origin: wrapper.to_owned(),
        include_dirs: Vec::new(),
        lib_dirs: Vec::new(),
        libs: Vec::new(),
    };
    let words = flags
        .split_whitespace()
        .map(|word| word.trim_matches(|c| c == '"' || c == '\''));
    for word in words {
        if let Some(dir) = word.strip_prefix("-I") {
            install.include_dirs.push(PathBuf::from(dir));
        } else if let Some(dir) = word.strip_prefix("-L") {
            install.lib_dirs.push(PathBuf::from(dir));
        } else if let Some(lib) = word.strip_prefix("-l") {
            install.libs.push(lib.to_owned());
        }
    }
    if install.libs.is_empty() {
        install.libs.push("mpi".to_owned());
    }
    install
}
