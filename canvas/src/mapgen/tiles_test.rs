use std::collections::{HashSet, VecDeque};

use rand::SeedableRng;

use super::*;

/// Floor cells reachable from `start` through 4-neighbour floor cells.
fn reachable(grid: &TileGrid, floor: Terrain, start: (u32, u32)) -> HashSet<(u32, u32)> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([start]);
    while let Some((x, y)) = queue.pop_front() {
        if grid.get(x, y) != Some(floor) || !seen.insert((x, y)) {
            continue;
        }
        if x > 0 {
            queue.push_back((x - 1, y));
        }
        if y > 0 {
            queue.push_back((x, y - 1));
        }
        queue.push_back((x + 1, y));
        queue.push_back((x, y + 1));
    }
    seen
}

#[test]
fn filled_grid_covers_every_cell_once() {
    let grid = TileGrid::filled(7, 5, Terrain::Grass);
    assert_eq!(grid.len(), 35);
    let cells: HashSet<(u32, u32)> = grid.iter().map(|(x, y, _)| (x, y)).collect();
    assert_eq!(cells.len(), 35);
    assert!(grid.iter().all(|(x, y, t)| x < 7 && y < 5 && t == Terrain::Grass));
}

#[test]
fn out_of_range_access_is_ignored() {
    let mut grid = TileGrid::filled(2, 2, Terrain::Cobble);
    grid.set(5, 5, Terrain::RockWall);
    assert_eq!(grid.get(5, 5), None);
    assert_eq!(grid.count(Terrain::Cobble), 4);
}

#[test]
fn carved_floor_is_connected_to_the_center() {
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut grid = TileGrid::filled(24, 18, Terrain::RockWall);
        carve_walk(&mut grid, Terrain::Cobble, 400, &mut rng);

        let floor = grid.count(Terrain::Cobble);
        assert!(floor > 1, "seed {seed}: walk carved nothing");
        let seen = reachable(&grid, Terrain::Cobble, grid.center());
        assert_eq!(seen.len(), floor, "seed {seed}: disconnected floor");
    }
}

#[test]
fn walk_never_carves_the_border() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut grid = TileGrid::filled(10, 8, Terrain::StoneWall);
    carve_walk(&mut grid, Terrain::WoodFloor, 2_000, &mut rng);
    for (x, y, t) in grid.iter() {
        if x == 0 || y == 0 || x == 9 || y == 7 {
            assert_eq!(t, Terrain::StoneWall, "border cell {x},{y} carved");
        }
    }
}

#[test]
fn tiny_grids_still_carve_the_center() {
    for (w, h) in [(1, 1), (2, 1), (2, 2), (3, 3)] {
        let mut rng = StdRng::seed_from_u64(3);
        let mut grid = TileGrid::filled(w, h, Terrain::RockWall);
        carve_walk(&mut grid, Terrain::Cobble, 50, &mut rng);
        let (cx, cy) = grid.center();
        assert_eq!(grid.get(cx, cy), Some(Terrain::Cobble), "{w}x{h}");
        assert_eq!(reachable(&grid, Terrain::Cobble, (cx, cy)).len(), grid.count(Terrain::Cobble));
    }
}

#[test]
fn zero_steps_carves_only_the_center() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut grid = TileGrid::filled(9, 9, Terrain::RockWall);
    carve_walk(&mut grid, Terrain::Cobble, 0, &mut rng);
    assert_eq!(grid.count(Terrain::Cobble), 1);
    assert_eq!(grid.get(4, 4), Some(Terrain::Cobble));
}

#[test]
fn texture_is_tile_sized_and_opaque() {
    let mut rng = StdRng::seed_from_u64(9);
    let Some(texture) = noise_texture(Terrain::Grass, 32, &mut rng) else {
        panic!("texture alloc failed");
    };
    assert_eq!((texture.width(), texture.height()), (32, 32));
    assert!(texture.pixels().iter().all(|p| p.alpha() == 255));
    let distinct: HashSet<_> = texture.pixels().iter().map(|p| (p.red(), p.green(), p.blue())).collect();
    assert!(distinct.len() > 1, "no speckles");
}
