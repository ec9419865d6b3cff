use divan::{Bencher, black_box};

fn main() {
    divan::main();
}

const CATALOG_XML: &[u8] = include_bytes!("../tests/fixtures/catalog.xml"); // ~2.5KB

/// A larger document built by repeating the catalog's vendors.
fn large_document() -> Vec<u8> {
    let doc = xylem::parse(CATALOG_XML).expect("fixture parses");
    let mut big: xylem::Document = xylem::parse(b"<catalog/>").expect("shell parses");
    for _ in 0..50 {
        let mut vendor = doc.first_element_child(doc.root()).expect("has vendor");
        loop {
            big.graft(big.root(), &doc, vendor).expect("graft");
            match doc.next_sibling(vendor) {
                Some(next) => vendor = next,
                None => break,
            }
        }
    }
    big.to_xml().into_bytes()
}

#[divan::bench]
fn parse_catalog(bencher: Bencher) {
    bencher.bench_local(|| {
        let doc = xylem::parse(black_box(CATALOG_XML)).unwrap();
        black_box(doc);
    });
}

#[divan::bench]
fn parse_large(bencher: Bencher) {
    let xml = large_document();
    bencher.bench_local(|| {
        let doc = xylem::parse(black_box(&xml)).unwrap();
        black_box(doc);
    });
}

#[divan::bench]
fn serialize_catalog(bencher: Bencher) {
    let doc = xylem::parse(CATALOG_XML).unwrap();
    bencher.bench_local(|| {
        let xml = black_box(&doc).to_xml();
        black_box(xml);
    });
}

#[divan::bench]
fn full_cycle_catalog(bencher: Bencher) {
    bencher.bench_local(|| {
        let doc = xylem::parse(black_box(CATALOG_XML)).unwrap();
        let xml = doc.to_xml();
        black_box(xml);
    });
}

#[divan::bench]
fn resolve_paths(bencher: Bencher) {
    let doc = xylem::parse(CATALOG_XML).unwrap();
    let root = doc.root();
    bencher.bench_local(|| {
        let title = doc.get(root, black_box("/vendor[2]/product[1]/title"));
        let price = doc.get_f64(root, black_box("/vendor[0]/product[0]/price"));
        black_box((title, price));
    });
}
