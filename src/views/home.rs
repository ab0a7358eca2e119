//! Landing page content

/// A poem highlighted on the landing page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeaturedPoem {
    pub title: &'static str,
    pub author: &'static str,
    pub dynasty: &'static str,
    pub excerpt: &'static str,
}

static FEATURED: [FeaturedPoem; 3] = [
    FeaturedPoem {
        title: "静夜思",
        author: "李白",
        dynasty: "唐代",
        excerpt: "床前明月光，疑是地上霜。举头望明月，低头思故乡。",
    },
    FeaturedPoem {
        title: "春晓",
        author: "孟浩然",
        dynasty: "唐代",
        excerpt: "春眠不觉晓，处处闻啼鸟。夜来风雨声，花落知多少。",
    },
    FeaturedPoem {
        title: "水调歌头",
        author: "苏轼",
        dynasty: "宋代",
        excerpt: "明月几时有？把酒问青天。不知天上宫阙，今夕是何年。",
    },
];

/// Featured poems, in display order
pub fn featured_poems() -> &'static [FeaturedPoem] {
    &FEATURED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_featured_poems() {
        let poems = featured_poems();
        assert_eq!(poems.len(), 3);
        assert_eq!(poems[0].title, "静夜思");
        assert!(poems.iter().all(|p| !p.excerpt.is_empty()));
    }
}
