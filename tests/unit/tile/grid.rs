use super::*;

#[test]
fn counts_round_up() {
    let g = TileGrid::new(Size2::new(1024, 768), 64).unwrap();
    assert_eq!(g.num_tiles_x(), 16);
    assert_eq!(g.num_tiles_y(), 12);
    assert_eq!(g.total(), 192);

    let g = TileGrid::new(Size2::new(65, 1), 64).unwrap();
    assert_eq!(g.num_tiles_x(), 2);
    assert_eq!(g.num_tiles_y(), 1);
}

#[test]
fn edge_tiles_are_clipped() {
    let g = TileGrid::new(Size2::new(100, 70), 64).unwrap();
    assert_eq!(g.total(), 4);
    assert_eq!(
        g.rect(0).unwrap(),
        TileRect {
            x0: 0,
            y0: 0,
            x1: 64,
            y1: 64
        }
    );
    assert_eq!(
        g.rect(3).unwrap(),
        TileRect {
            x0: 64,
            y0: 64,
            x1: 100,
            y1: 70
        }
    );
    assert_eq!(g.rect(4), None);
}

#[test]
fn index_mapping_is_row_major() {
    let g = TileGrid::new(Size2::new(300, 200), 64).unwrap();
    assert_eq!(g.num_tiles_x(), 5);
    for i in 0..g.total() {
        let (tx, ty) = g.coords(i).unwrap();
        assert_eq!(tx, i % 5);
        assert_eq!(ty, i / 5);
        assert_eq!(g.index_of(tx, ty), Some(i));
    }
    assert_eq!(g.tile_at(299, 199), Some(g.total() - 1));
    assert_eq!(g.tile_at(300, 0), None);
}

#[test]
fn rects_cover_frame_exactly_once() {
    for &(w, h, s) in &[
        (1u32, 1u32, 64u32),
        (64, 64, 64),
        (65, 63, 64),
        (127, 129, 16),
        (320, 240, 7),
        (1024, 768, 64),
    ] {
        let g = TileGrid::new(Size2::new(w, h), s).unwrap();
        let mut hits = vec![0u8; (w * h) as usize];
        for r in g.rects() {
            assert!(r.width() > 0 && r.height() > 0);
            for y in r.y0..r.y1 {
                for x in r.x0..r.x1 {
                    hits[(y * w + x) as usize] += 1;
                }
            }
        }
        assert!(hits.iter().all(|&c| c == 1), "{w}x{h}/{s} coverage");
    }
}

#[test]
fn rejects_degenerate_inputs() {
    assert!(matches!(
        TileGrid::new(Size2::new(0, 10), 64),
        Err(RaytileError::Validation(_))
    ));
    assert!(matches!(
        TileGrid::new(Size2::new(10, 10), 0),
        Err(RaytileError::Validation(_))
    ));
}
