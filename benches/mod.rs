use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    linebuffer::bench_write_lines,
    linebuffer::bench_write_overlong,
    multiplexer::bench_tick_passthrough,
    multiplexer::bench_tick_line_buffered,
    multiplexer::bench_issue_and_reap
);
criterion_main!(benches);
