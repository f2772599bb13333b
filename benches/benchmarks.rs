// benches/benchmarks.rs — Performance benchmarks (criterion)
//
// Hot paths while a lesson is open:
//   1. Frame parsing — every streamed chunk goes through FrameParser
//   2. Content formatting — every bubble is escaped and formatted on render
//   3. View rendering — the whole conversation is re-rendered per update

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tutorlink::lesson::{LessonSession, Message};
use tutorlink::render::{format_content, render, RenderContext};
use tutorlink::stream::parser::FrameParser;

// ─── Helpers ────────────────────────────────────────────────────────────────

/// A realistic reply streamed as N `data:` frames.
fn build_stream(frames: usize) -> Vec<u8> {
    let mut out = String::new();
    for i in 0..frames {
        let text = format!("Step {i}: multiply the numerator by {}. ", i % 7 + 2);
        out.push_str("data: ");
        out.push_str(&serde_json::json!({ "text": text }).to_string());
        out.push_str("\n\n");
    }
    out.push_str("data: [DONE]\n\n");
    out.into_bytes()
}

fn tutor_reply() -> String {
    "**Learning Objectives:**\n- add fractions with unlike denominators\n- simplify results\n\n\
     To add $\\frac{1}{3}$ and $\\frac{1}{6}$ we first find a common denominator:\n\
     $$\\frac{1}{3} = \\frac{2}{6}$$\n\
     In code that looks like `lcm(a, b)`:\n```python\ndef lcm(a, b):\n    return a * b // gcd(a, b)\n```\n\
     Check: is 3/6 < 1? Yes, so the answer 1/2 is a proper fraction & already simplified."
        .repeat(4)
}

fn build_session(exchanges: usize) -> LessonSession {
    let mut s = LessonSession::pending("T_fractions");
    s.start("L_bench", vec![Message::ai("Welcome! Today: fractions.")])
        .expect("start");
    let reply = tutor_reply();
    for i in 0..exchanges {
        s.push_user(format!("Question {i}: why do we need a common denominator?"))
            .expect("user");
        s.push_ai(reply.clone()).expect("ai");
    }
    s
}

// ─── Benchmark: Frame parsing ───────────────────────────────────────────────

fn bench_parser(c: &mut Criterion) {
    let stream = build_stream(200);
    let mut group = c.benchmark_group("frame_parser");

    for chunk in [16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::new("chunk", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut parser = FrameParser::new();
                let mut events = 0;
                for piece in stream.chunks(chunk) {
                    events += parser.push(black_box(piece)).len();
                }
                events += parser.finish().len();
                events
            })
        });
    }

    group.finish();
}

// ─── Benchmark: Content formatting ──────────────────────────────────────────

fn bench_format(c: &mut Criterion) {
    let reply = tutor_reply();
    c.bench_function("format_content_reply", |b| {
        b.iter(|| format_content(black_box(&reply)))
    });

    let plain = "Plain sentence without any markup at all. ".repeat(100);
    c.bench_function("format_content_plain", |b| {
        b.iter(|| format_content(black_box(&plain)))
    });
}

// ─── Benchmark: View rendering ──────────────────────────────────────────────

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    for exchanges in [5usize, 50] {
        let session = build_session(exchanges);
        group.bench_with_input(
            BenchmarkId::new("conversation", exchanges),
            &session,
            |b, session| {
                b.iter(|| {
                    let ctx = RenderContext {
                        pending_reply: Some("Let me think about"),
                        ..RenderContext::interactive()
                    };
                    render(black_box(session), &ctx).to_html()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_parser, bench_format, bench_render);
criterion_main!(benches);
