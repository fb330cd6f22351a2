//! Benchmarks for the ladder cascade and the nodal solvers
//!
//! Ladders of LC sections are swept over growing frequency grids; the nodal
//! benches time one transient run and the diode state search.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rfcircuit_core::config::TransientOptions;
use rfcircuit_core::{
    compute_parameters, dc_operating_point, evaluate_at, parse_netlist, transient_analysis,
    z_parameters_symbolic, AnalysisOptions, Frequency, Netlist, ParameterKind, PortSpec,
};

/// Low-pass ladder of `sections` series-L / shunt-C sections plus a stub
fn ladder(sections: usize) -> (Netlist, PortSpec) {
    let mut text = String::new();
    for k in 1..=sections {
        text.push_str(&format!("L{k} {} {} 8.2n\n", k, k + 1));
        text.push_str(&format!("C{k} {} 0 3.3p\n", k + 1));
    }
    let out = sections + 1;
    text.push_str(&format!("OS1 {out} {} 50 45 1 GHz\n", out + 100));
    text.push_str(&format!("Port1 1 0 50\nPort2 {out} 0 50\n"));
    let netlist = parse_netlist(&text).expect("ladder netlist parses");
    let ports = PortSpec::new("1", "0", &out.to_string(), "0");
    (netlist, ports)
}

fn bench_s_parameters(c: &mut Criterion) {
    let mut group = c.benchmark_group("s_parameters");
    let options = AnalysisOptions::default();

    for nfreq in [11, 101, 1001].iter() {
        for sections in [1, 5, 20].iter() {
            let (netlist, ports) = ladder(*sections);
            let freq = Frequency::linear_hz(1e8, 3e9, *nfreq).expect("valid grid");
            let id = BenchmarkId::new(format!("{}sections", sections), nfreq);

            group.bench_with_input(id, nfreq, |b, _| {
                b.iter(|| {
                    black_box(compute_parameters(
                        &netlist,
                        &freq,
                        &ports,
                        ParameterKind::S,
                        &options,
                    ))
                })
            });
        }
    }

    group.finish();
}

fn bench_symbolic(c: &mut Criterion) {
    let mut group = c.benchmark_group("symbolic_z");
    let options = AnalysisOptions::default();

    for sections in [1, 5, 20].iter() {
        let (netlist, ports) = ladder(*sections);
        let expr = z_parameters_symbolic(&netlist, &ports, &options).expect("ports exist");

        group.bench_with_input(BenchmarkId::new("build", sections), sections, |b, _| {
            b.iter(|| black_box(z_parameters_symbolic(&netlist, &ports, &options)))
        });
        group.bench_with_input(BenchmarkId::new("evaluate", sections), sections, |b, _| {
            b.iter(|| black_box(evaluate_at(&expr, black_box(1.2e9))))
        });
    }

    group.finish();
}

fn bench_nodal(c: &mut Criterion) {
    let mut group = c.benchmark_group("nodal");
    let options = AnalysisOptions::default();

    let rc = parse_netlist("V1 1 0 SIN(0 1 1k)\nR1 1 2 1k\nC1 2 0 1u\nL1 2 3 1m\nR2 3 0 50")
        .expect("rc netlist parses");
    for points in [100, 1000].iter() {
        let window = TransientOptions::new(5e-3, *points);
        group.bench_with_input(BenchmarkId::new("transient", points), points, |b, _| {
            b.iter(|| black_box(transient_analysis(&rc, &window, &options)))
        });
    }

    let bridge = parse_netlist(
        "V1 1 0 5\n\
         D1 1 2\nD2 3 1\nD3 0 2\nD4 3 0\n\
         R1 2 3 1k",
    )
    .expect("bridge netlist parses");
    group.bench_function("diode_search", |b| {
        b.iter(|| black_box(dc_operating_point(&bridge, &options)))
    });

    group.finish();
}

criterion_group!(benches, bench_s_parameters, bench_symbolic, bench_nodal);
criterion_main!(benches);
