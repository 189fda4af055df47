use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pysyntax::check::check_files;
use pysyntax::{ParseOptions, parse, tokenize};
use std::fs;
use tempfile::TempDir;

/// Generate a Python module that touches most of the grammar: imports,
/// decorators, classes, comprehensions, f-strings and every block statement.
fn make_python_file(index: usize) -> String {
    format!(
        r#"
import os
import sys as system
from collections import (OrderedDict, defaultdict,)
from . import sibling

CONSTANT_{i}: int = {i}
PATTERN_{i} = r"\d+" "suffix"

@dataclass(frozen=True)
class Record_{i}(Base, metaclass=Meta):
    """A record with a docstring."""
    name: str = "record"

    def __init__(self, value, *args, scale: float = 1.0, **kwargs) -> None:
        super().__init__(*args, **kwargs)
        self.value = value * scale

    @property
    def label(self):
        return f"{{self.name!r:>{{width}}}}-{{self.value:.2f}}"

    async def fetch(self, session, /, retries=3):
        async with session.get(self.url) as resp:
            return await resp.json()

def transform_{i}(items, limit=None):
    squares = [x ** 2 for x in items if x % 2 == 0]
    lookup = {{k: v for k, v in zip(items, squares)}}
    unique = {{abs(x) for x in items}}
    total = sum(x for x in squares if 0 < x <= 100)
    first, *rest = items or [0]
    try:
        value = lookup[items[0]] if items else None
    except (KeyError, IndexError) as e:
        raise ValueError("bad items") from e
    else:
        total += 1
    finally:
        del squares
    while total > 0 and not limit:
        total -= 1
        if total is None or total not in unique:
            break
        elif total < -1:
            continue
    for idx, (a, b) in enumerate(pairs[1::2]):
        yield lambda x, y=2: x + y + a * b
    return (first, rest, value)

result_{i} = transform_{i}([1, 2, 3], limit=10)
print(os.path.join("a", "b"), system.version, sep=" ")
"#,
        i = index
    )
}

fn bench_parse(c: &mut Criterion) {
    let source = make_python_file(0);
    let options = ParseOptions::default();

    c.bench_function("tokenize_single_module", |b| {
        b.iter(|| {
            let tokens = tokenize(black_box(&source), &options).unwrap();
            black_box(tokens);
        });
    });

    c.bench_function("parse_single_module", |b| {
        b.iter(|| {
            let tree = parse(black_box(&source)).unwrap();
            black_box(tree);
        });
    });

    // A single large file.
    let big_source: String = (0..200)
        .map(make_python_file)
        .collect::<Vec<_>>()
        .join("\n");

    c.bench_function("parse_single_large_file", |b| {
        b.iter(|| {
            let tree = parse(black_box(&big_source)).unwrap();
            black_box(tree);
        });
    });

    // A temporary corpus of 50 modules through the parallel checker.
    let dir = TempDir::new().unwrap();
    let mut files = Vec::new();
    for i in 0..50 {
        let path = dir.path().join(format!("module_{i}.py"));
        fs::write(&path, make_python_file(i)).unwrap();
        files.push(path);
    }

    c.bench_function("check_files_50_modules", |b| {
        b.iter(|| {
            let report = check_files(black_box(&files), &options).unwrap();
            black_box(report);
        });
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
