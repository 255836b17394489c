mod story;
mod story_fact;

pub use story::{Story, StorySettings};
pub use story_fact::{
    Bookmark, FactKind, Rating, Read, ReadScope, Recorded, Reward, StoryBookmark, StoryFact,
    StoryRating, StoryRead, StoryReward,
};
